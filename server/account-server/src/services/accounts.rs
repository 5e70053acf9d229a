//! Account lifecycle around the auth session core
//!
//! Registration and verification, password reset and change, profile edits,
//! profile images, self-deletion, OAuth account resolution and the admin
//! operations. Session issuance and revocation stay in
//! [`AuthSessionManager`]; when an account disappears this service drops its
//! refresh entry and revokes it for one access-token lifetime.

use crate::services::images::ImageStore;
use crate::types::Pagination;
use auth_identity::{
    generate_one_time_token, normalize_email, Account, AccountConfig, AccountProfile,
    AccountQuery, AuthSessionManager, Clock, CredentialHasher, CredentialStore, IdentityError,
    PasswordPolicy, Result, Role, SessionRegistry,
};
use auth_oauth::OAuthProfile;
use email_service::{AccountEmails, EmailDispatcher, RenderedEmail};
use logger_redacted::{redact, redacted_warn};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Partial profile edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AccountListing {
    pub users: Vec<AccountProfile>,
    pub pagination: Pagination,
}

pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    registry: Arc<dyn SessionRegistry>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn EmailDispatcher>,
    emails: Arc<AccountEmails>,
    images: ImageStore,
    policy: PasswordPolicy,
    settings: AccountConfig,
    access_ttl: Duration,
}

impl AccountService {
    pub fn new(
        sessions: &AuthSessionManager,
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn EmailDispatcher>,
        emails: AccountEmails,
        images: ImageStore,
        policy: PasswordPolicy,
        settings: AccountConfig,
    ) -> Self {
        Self {
            store,
            registry: sessions.registry(),
            hasher: sessions.hasher().clone(),
            clock: sessions.clock(),
            mailer,
            emails: Arc::new(emails),
            images,
            policy,
            settings,
            access_ttl: sessions.access_token_ttl(),
        }
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub async fn register(&self, registration: Registration) -> Result<AccountProfile> {
        self.policy.validate(&registration.password)?;
        if self.store.find_by_email(&registration.email).await?.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        let password_hash = self.hasher.hash(&registration.password).await?;
        let token = generate_one_time_token();
        let account = Account::new_local(
            registration.first_name.trim().to_string(),
            registration.last_name.trim().to_string(),
            &registration.email,
            password_hash,
            token.clone(),
            self.clock.now(),
        );
        self.store.insert(&account).await?;

        info!(subject_id = %account.id, "Account registered");
        self.send_verification(&account, &token);
        Ok(account.profile())
    }

    pub async fn verify_email(&self, token: &str) -> Result<()> {
        if token.is_empty() || !self.store.mark_verified(token).await? {
            return Err(IdentityError::InvalidVerificationToken);
        }
        debug!("Email verified");
        Ok(())
    }

    /// Succeeds whether or not the email belongs to an account
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(account) = self.store.find_by_email(email).await? else {
            debug!(email = %redact(email), "Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_one_time_token();
        let ttl = self.settings.reset_token_ttl();
        self.store
            .set_reset_token(account.id, &token, self.clock.now() + ttl)
            .await?;

        let expires_in = match ttl.num_minutes() {
            60 => "1 hour".to_string(),
            minutes => format!("{minutes} minutes"),
        };
        let rendered = self
            .emails
            .password_reset(&account.first_name, &token, &expires_in);
        self.dispatch(&account.email, rendered);

        info!(subject_id = %account.id, "Password reset token issued");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        self.policy.validate(new_password)?;
        let mut account = self
            .store
            .consume_reset_token(token, self.clock.now())
            .await?
            .ok_or(IdentityError::InvalidResetToken)?;

        account.password_hash = Some(self.hasher.hash(new_password).await?);
        account.updated_at = self.clock.now();
        self.store.update(&account).await?;

        info!(subject_id = %account.id, "Password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        subject_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let mut account = self.load(subject_id).await?;
        self.confirm_password(&account, current_password).await?;
        self.policy.validate(new_password)?;

        account.password_hash = Some(self.hasher.hash(new_password).await?);
        account.updated_at = self.clock.now();
        self.store.update(&account).await?;

        info!(subject_id = %subject_id, "Password changed");
        Ok(())
    }

    pub async fn profile(&self, subject_id: Uuid) -> Result<AccountProfile> {
        Ok(self.load(subject_id).await?.profile())
    }

    /// A changed email must be verified again
    pub async fn update_profile(
        &self,
        subject_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<AccountProfile> {
        let mut account = self.load(subject_id).await?;

        if let Some(first_name) = changes.first_name {
            account.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = changes.last_name {
            account.last_name = last_name.trim().to_string();
        }

        let mut verification = None;
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            if email != account.email {
                if self.store.find_by_email(&email).await?.is_some() {
                    return Err(IdentityError::EmailAlreadyInUse);
                }
                let token = generate_one_time_token();
                account.email = email;
                account.is_verified = false;
                account.verification_token = Some(token.clone());
                verification = Some(token);
            }
        }

        account.updated_at = self.clock.now();
        self.store.update(&account).await?;

        if let Some(token) = verification {
            info!(subject_id = %subject_id, "Email changed, verification required");
            self.send_verification(&account, &token);
        }
        Ok(account.profile())
    }

    /// Store a new image and drop the previous one
    pub async fn upload_profile_image(
        &self,
        subject_id: Uuid,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<AccountProfile> {
        let mut account = self.load(subject_id).await?;
        let filename = self.images.save(bytes, content_type).await?;

        let previous = account.profile_image.replace(filename.clone());
        account.updated_at = self.clock.now();
        if let Err(e) = self.store.update(&account).await {
            self.discard_image(&filename).await;
            return Err(e);
        }

        if let Some(previous) = previous {
            self.discard_image(&previous).await;
        }
        Ok(account.profile())
    }

    /// `false` when the account had no image
    pub async fn delete_profile_image(&self, subject_id: Uuid) -> Result<bool> {
        let mut account = self.load(subject_id).await?;
        let Some(filename) = account.profile_image.take() else {
            return Ok(false);
        };

        account.updated_at = self.clock.now();
        self.store.update(&account).await?;
        self.discard_image(&filename).await;
        Ok(true)
    }

    pub async fn delete_own_account(&self, subject_id: Uuid, password: &str) -> Result<()> {
        let account = self.load(subject_id).await?;
        self.confirm_password(&account, password).await?;
        self.remove_account(&account).await?;

        info!(subject_id = %subject_id, "Account deleted by owner");
        Ok(())
    }

    /// Find by provider subject, else link by email, else create
    pub async fn resolve_oauth_account(&self, profile: &OAuthProfile) -> Result<Account> {
        if let Some(account) = self
            .store
            .find_by_external_subject(&profile.external_subject_id)
            .await?
        {
            return Ok(account);
        }

        if let Some(mut account) = self.store.find_by_email(&profile.email).await? {
            account.google_id = Some(profile.external_subject_id.clone());
            // The provider asserted this email as verified
            account.is_verified = true;
            account.verification_token = None;
            account.updated_at = self.clock.now();
            self.store.update(&account).await?;

            info!(subject_id = %account.id, "Linked external identity to existing account");
            return Ok(account);
        }

        let account = Account::new_external(
            profile.external_subject_id.clone(),
            profile.given_name.clone(),
            profile.family_name.clone(),
            &profile.email,
            self.clock.now(),
        );
        self.store.insert(&account).await?;

        info!(subject_id = %account.id, "Account created from external identity");
        Ok(account)
    }

    pub async fn list_accounts(
        &self,
        page: u32,
        limit: u32,
        search: Option<String>,
    ) -> Result<AccountListing> {
        let query = AccountQuery {
            page,
            limit,
            search,
        };
        let result = self.store.list(&query).await?;

        Ok(AccountListing {
            users: result.accounts.iter().map(Account::profile).collect(),
            pagination: Pagination::new(page, limit, result.total),
        })
    }

    pub async fn account(&self, id: Uuid) -> Result<AccountProfile> {
        self.profile(id).await
    }

    /// Takes effect on the subject's next login or refresh
    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<AccountProfile> {
        let mut account = self.load(id).await?;
        account.role = role;
        account.updated_at = self.clock.now();
        self.store.update(&account).await?;

        info!(subject_id = %id, role = %role, "Role updated");
        Ok(account.profile())
    }

    pub async fn delete_account(&self, actor: Uuid, id: Uuid) -> Result<()> {
        if actor == id {
            return Err(IdentityError::SelfDeletion);
        }
        let account = self.load(id).await?;
        self.remove_account(&account).await?;

        info!(subject_id = %id, actor = %actor, "Account deleted by administrator");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Account> {
        self.store
            .find_by_subject_id(id)
            .await?
            .ok_or(IdentityError::AccountNotFound)
    }

    /// OAuth-only accounts have no password to confirm
    async fn confirm_password(&self, account: &Account, password: &str) -> Result<()> {
        let Some(hash) = account.password_hash.as_deref() else {
            return Err(IdentityError::IncorrectPassword);
        };
        if self.hasher.verify(password, hash).await? {
            Ok(())
        } else {
            Err(IdentityError::IncorrectPassword)
        }
    }

    async fn remove_account(&self, account: &Account) -> Result<()> {
        if !self.store.delete(account.id).await? {
            return Err(IdentityError::AccountNotFound);
        }
        // Outstanding access tokens die with the account
        self.registry.revoke(account.id, "", self.access_ttl).await?;
        self.registry.delete_refresh(account.id).await?;
        if let Some(filename) = &account.profile_image {
            self.discard_image(filename).await;
        }
        Ok(())
    }

    async fn discard_image(&self, filename: &str) {
        if let Err(e) = self.images.remove(filename).await {
            warn!(file = %filename, error = %e, "Failed to remove profile image");
        }
    }

    fn send_verification(&self, account: &Account, token: &str) {
        let rendered = self.emails.verification(&account.first_name, token);
        self.dispatch(&account.email, rendered);
    }

    /// Fire and forget; delivery failures are logged only
    fn dispatch(&self, to: &str, rendered: email_service::EmailResult<RenderedEmail>) {
        let email = match rendered {
            Ok(email) => email,
            Err(e) => {
                warn!(recipient = %redact(to), error = %e, "Failed to render email");
                return;
            }
        };

        let mailer = self.mailer.clone();
        let to = to.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &email.subject, &email.html).await {
                // SMTP replies can echo the address back
                redacted_warn!("Email dispatch to {to} failed: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use auth_identity::{
        AuthConfig, HashingConfig, InMemoryCredentialStore, InMemorySessionRegistry, ManualClock,
        PasswordCredentials, TokenConfig,
    };
    use email_service::EmailResult;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const PASSWORD: &str = "Secret123";
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[derive(Debug)]
    struct Sent {
        to: String,
        subject: String,
        html: String,
    }

    struct RecordingMailer(mpsc::UnboundedSender<Sent>);

    #[async_trait]
    impl EmailDispatcher for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, html: &str) -> EmailResult<String> {
            let _ = self.0.send(Sent {
                to: to.into(),
                subject: subject.into(),
                html: html.into(),
            });
            Ok("recorded".into())
        }
    }

    struct Harness {
        service: AccountService,
        sessions: Arc<AuthSessionManager>,
        store: Arc<InMemoryCredentialStore>,
        registry: Arc<InMemorySessionRegistry>,
        clock: Arc<ManualClock>,
        outbox: mpsc::UnboundedReceiver<Sent>,
        _uploads: tempfile::TempDir,
    }

    impl Harness {
        async fn next_email(&mut self) -> Sent {
            tokio::time::timeout(Duration::from_secs(2), self.outbox.recv())
                .await
                .unwrap()
                .unwrap()
        }

        async fn stored(&self, email: &str) -> Account {
            self.store.find_by_email(email).await.unwrap().unwrap()
        }

        async fn register(&mut self, email: &str) -> AccountProfile {
            let profile = self
                .service
                .register(Registration {
                    first_name: "Ada".into(),
                    last_name: "Lovelace".into(),
                    email: email.into(),
                    password: PASSWORD.into(),
                })
                .await
                .unwrap();
            self.next_email().await;
            profile
        }

        async fn register_verified(&mut self, email: &str) -> AccountProfile {
            let profile = self.register(email).await;
            let token = self.stored(email).await.verification_token.unwrap();
            self.service.verify_email(&token).await.unwrap();
            profile
        }
    }

    fn harness() -> Harness {
        let mut config = AuthConfig::new(TokenConfig::new("access-secret", "refresh-secret"));
        config.hashing = HashingConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        };
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(InMemoryCredentialStore::new());
        let registry = Arc::new(InMemorySessionRegistry::new(clock.clone()));
        let sessions = Arc::new(
            AuthSessionManager::new(&config, registry.clone(), store.clone(), clock.clone())
                .unwrap(),
        );
        let (tx, outbox) = mpsc::unbounded_channel();
        let uploads = tempfile::tempdir().unwrap();

        let service = AccountService::new(
            &sessions,
            store.clone(),
            Arc::new(RecordingMailer(tx)),
            AccountEmails::new("http://localhost:3000").unwrap(),
            ImageStore::new(uploads.path().join("profile-images")),
            config.password.clone(),
            config.account.clone(),
        );

        Harness {
            service,
            sessions,
            store,
            registry,
            clock,
            outbox,
            _uploads: uploads,
        }
    }

    #[tokio::test]
    async fn test_register_then_verify_unlocks_login() {
        let mut h = harness();
        let profile = h
            .service
            .register(Registration {
                first_name: " Ada ".into(),
                last_name: "Lovelace".into(),
                email: "Ada@Example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.role, Role::User);
        assert!(!profile.is_verified);

        let mail = h.next_email().await;
        let token = h.stored("ada@example.com").await.verification_token.unwrap();
        assert_eq!(mail.to, "ada@example.com");
        assert_eq!(mail.subject, "Verify Your Email Address");
        assert!(mail.html.contains(&format!("/verify-email?token={token}")));

        let credentials = PasswordCredentials {
            email: "ada@example.com".into(),
            password: PASSWORD.into(),
        };
        assert!(matches!(
            h.sessions.login(&credentials).await,
            Err(IdentityError::UnverifiedAccount)
        ));

        h.service.verify_email(&token).await.unwrap();
        assert!(h.sessions.login(&credentials).await.is_ok());
        assert!(matches!(
            h.service.verify_email(&token).await,
            Err(IdentityError::InvalidVerificationToken)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password_and_duplicates() {
        let mut h = harness();
        let weak = h
            .service
            .register(Registration {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                password: "password".into(),
            })
            .await;
        assert!(matches!(weak, Err(IdentityError::WeakPassword(_))));

        h.register("ada@example.com").await;
        let duplicate = h
            .service
            .register(Registration {
                first_name: "Other".into(),
                last_name: "Person".into(),
                email: "ADA@example.com".into(),
                password: PASSWORD.into(),
            })
            .await;
        assert!(matches!(duplicate, Err(IdentityError::EmailAlreadyInUse)));
    }

    #[tokio::test]
    async fn test_password_reset_flow_and_expiry() {
        let mut h = harness();
        h.register_verified("ada@example.com").await;

        h.service.forgot_password("nobody@example.com").await.unwrap();
        h.service.forgot_password("ada@example.com").await.unwrap();
        let mail = h.next_email().await;
        assert_eq!(mail.subject, "Password Reset Request");
        assert!(mail.html.contains("expire in 1 hour"));

        let token = h.stored("ada@example.com").await.reset_password_token.unwrap();
        assert!(mail.html.contains(&format!("/reset-password?token={token}")));

        assert!(matches!(
            h.service.reset_password(&token, "short").await,
            Err(IdentityError::WeakPassword(_))
        ));
        h.service.reset_password(&token, "NewSecret1").await.unwrap();
        assert!(matches!(
            h.service.reset_password(&token, "NewSecret1").await,
            Err(IdentityError::InvalidResetToken)
        ));

        let login = h
            .sessions
            .login(&PasswordCredentials {
                email: "ada@example.com".into(),
                password: "NewSecret1".into(),
            })
            .await;
        assert!(login.is_ok());

        h.service.forgot_password("ada@example.com").await.unwrap();
        h.next_email().await;
        let token = h.stored("ada@example.com").await.reset_password_token.unwrap();
        h.clock.advance(chrono::Duration::minutes(61));
        assert!(matches!(
            h.service.reset_password(&token, "Another1").await,
            Err(IdentityError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let mut h = harness();
        let profile = h.register_verified("ada@example.com").await;

        assert!(matches!(
            h.service.change_password(profile.id, "Wrong123", "NewSecret1").await,
            Err(IdentityError::IncorrectPassword)
        ));
        h.service
            .change_password(profile.id, PASSWORD, "NewSecret1")
            .await
            .unwrap();

        let hash = h.stored("ada@example.com").await.password_hash.unwrap();
        assert!(h.sessions.hasher().verify("NewSecret1", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_email_change_resets_verification() {
        let mut h = harness();
        let profile = h.register_verified("ada@example.com").await;
        h.register("taken@example.com").await;

        assert!(matches!(
            h.service
                .update_profile(
                    profile.id,
                    ProfileChanges {
                        email: Some("taken@example.com".into()),
                        ..ProfileChanges::default()
                    },
                )
                .await,
            Err(IdentityError::EmailAlreadyInUse)
        ));

        let unchanged = h
            .service
            .update_profile(
                profile.id,
                ProfileChanges {
                    first_name: Some("Augusta".into()),
                    email: Some("ADA@example.com".into()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();
        assert!(unchanged.is_verified);
        assert_eq!(unchanged.first_name, "Augusta");

        let updated = h
            .service
            .update_profile(
                profile.id,
                ProfileChanges {
                    email: Some("augusta@example.com".into()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "augusta@example.com");
        assert!(!updated.is_verified);
        assert_eq!(h.next_email().await.to, "augusta@example.com");
    }

    #[tokio::test]
    async fn test_profile_image_replace_and_delete() {
        let mut h = harness();
        let profile = h.register_verified("ada@example.com").await;
        let root = h.service.images().root().to_path_buf();

        let first = h
            .service
            .upload_profile_image(profile.id, PNG, "image/png")
            .await
            .unwrap()
            .profile_image
            .unwrap();
        let second = h
            .service
            .upload_profile_image(profile.id, PNG, "image/webp")
            .await
            .unwrap()
            .profile_image
            .unwrap();
        assert!(!root.join(&first).exists());
        assert!(root.join(&second).exists());

        assert!(h.service.delete_profile_image(profile.id).await.unwrap());
        assert!(!root.join(&second).exists());
        assert!(!h.service.delete_profile_image(profile.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_own_account_requires_password() {
        let mut h = harness();
        let profile = h.register_verified("ada@example.com").await;
        h.sessions
            .login(&PasswordCredentials {
                email: "ada@example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();

        assert!(matches!(
            h.service.delete_own_account(profile.id, "Wrong123").await,
            Err(IdentityError::IncorrectPassword)
        ));
        h.service.delete_own_account(profile.id, PASSWORD).await.unwrap();

        assert!(h.store.is_empty().await);
        assert!(h.registry.get_refresh(profile.id).await.unwrap().is_none());
        assert!(h.registry.is_revoked(profile.id).await.unwrap());

        // The revocation outlives every token issued before deletion, then lapses
        h.clock.advance(chrono::Duration::minutes(16));
        assert!(!h.registry.is_revoked(profile.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_oauth_resolution_links_then_reuses() {
        let mut h = harness();
        let existing = h.register("ada@example.com").await;
        let google = OAuthProfile {
            external_subject_id: "google-1".into(),
            email: "Ada@example.com".into(),
            given_name: "Ada".into(),
            family_name: "L".into(),
        };

        let linked = h.service.resolve_oauth_account(&google).await.unwrap();
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.google_id.as_deref(), Some("google-1"));
        assert!(linked.is_verified);

        let again = h.service.resolve_oauth_account(&google).await.unwrap();
        assert_eq!(again.id, existing.id);

        let created = h
            .service
            .resolve_oauth_account(&OAuthProfile {
                external_subject_id: "google-2".into(),
                email: "grace@example.com".into(),
                given_name: "Grace".into(),
                family_name: "Hopper".into(),
            })
            .await
            .unwrap();
        assert_eq!(created.role, Role::User);
        assert!(created.is_verified);
        assert!(created.password_hash.is_none());
        assert_eq!(h.store.len().await, 2);
    }

    #[tokio::test]
    async fn test_admin_operations() {
        let mut h = harness();
        let admin = h.register_verified("admin@example.com").await;
        let user = h.register_verified("user@example.com").await;

        let listing = h.service.list_accounts(1, 10, Some("USER@".into())).await.unwrap();
        assert_eq!(listing.users.len(), 1);
        assert_eq!(listing.pagination.total_users, 1);
        assert!(!listing.pagination.has_next);

        let promoted = h.service.update_role(user.id, Role::Admin).await.unwrap();
        assert_eq!(promoted.role, Role::Admin);

        assert!(matches!(
            h.service.delete_account(admin.id, admin.id).await,
            Err(IdentityError::SelfDeletion)
        ));
        h.service.delete_account(admin.id, user.id).await.unwrap();
        assert!(h.registry.is_revoked(user.id).await.unwrap());
        assert!(!h.registry.is_revoked(admin.id).await.unwrap());
        assert!(matches!(
            h.service.account(user.id).await,
            Err(IdentityError::AccountNotFound)
        ));
        assert!(matches!(
            h.service.delete_account(admin.id, user.id).await,
            Err(IdentityError::AccountNotFound)
        ));
    }
}
