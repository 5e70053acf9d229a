//! Auth session lifecycle.
//!
//! Per subject: NoSession -> Active -> Active(rotated) -> Revoked -> NoSession.
//! Login and OAuth completion issue a pair and overwrite the refresh entry.
//! Refresh requires the presented token to equal the stored one, then rotates.
//! Logout revokes the subject for the access token's remaining lifetime and
//! drops the refresh entry. No lock spans the refresh read and overwrite, so
//! concurrent refreshes for one subject resolve as last write wins.

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::{IdentityError, Result};
use crate::identity::{AccountProfile, Identity};
use crate::password::CredentialHasher;
use crate::registry::SessionRegistry;
use crate::store::CredentialStore;
use crate::tokens::{TokenKind, TokenSigner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub tokens: TokenPair,
    pub identity: Identity,
    pub profile: AccountProfile,
}

pub struct AuthSessionManager {
    signer: TokenSigner,
    registry: Arc<dyn SessionRegistry>,
    store: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthSessionManager {
    pub fn new(
        config: &AuthConfig,
        registry: Arc<dyn SessionRegistry>,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            signer: TokenSigner::new(&config.token, clock.clone())?,
            registry,
            store,
            hasher: CredentialHasher::new(config.hashing)?,
            clock,
            access_ttl: config.token.access_token_ttl(),
            refresh_ttl: config.token.refresh_token_ttl(),
        })
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn registry(&self) -> Arc<dyn SessionRegistry> {
        self.registry.clone()
    }

    /// Upper bound on how long an issued access token stays valid
    pub fn access_token_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Password login
    ///
    /// Rejections are `InvalidCredentials`, `OAuthOnlyAccount` or
    /// `UnverifiedAccount`; callers must not tell them apart in responses.
    pub async fn login(&self, credentials: &PasswordCredentials) -> Result<AuthenticatedSession> {
        // Every rejection path pays for one Argon2 verification
        let Some(account) = self.store.find_by_email(&credentials.email).await? else {
            self.hasher.verify_decoy(&credentials.password).await?;
            return Err(IdentityError::InvalidCredentials);
        };

        let Some(hash) = account.password_hash.as_deref() else {
            self.hasher.verify_decoy(&credentials.password).await?;
            debug!(subject_id = %account.id, "Password login attempted on OAuth-only account");
            return Err(IdentityError::OAuthOnlyAccount);
        };

        if !self.hasher.verify(&credentials.password, hash).await? {
            return Err(IdentityError::InvalidCredentials);
        }

        if !account.is_verified {
            return Err(IdentityError::UnverifiedAccount);
        }

        let identity = account.identity();
        let tokens = self.start_session(&identity).await?;
        info!(subject_id = %identity.subject_id, role = %identity.role, "Login succeeded");

        Ok(AuthenticatedSession {
            tokens,
            identity,
            profile: account.profile(),
        })
    }

    /// Issue a session for an identity already resolved by the OAuth boundary
    pub async fn complete_oauth_login(&self, identity: &Identity) -> Result<TokenPair> {
        let tokens = self.start_session(identity).await?;
        info!(subject_id = %identity.subject_id, "OAuth login completed");
        Ok(tokens)
    }

    /// Rotate a refresh token
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair> {
        let claimed = self
            .signer
            .verify(presented, TokenKind::Refresh)
            .map_err(|e| match e {
                IdentityError::InvalidToken => IdentityError::InvalidRefreshToken,
                other => other,
            })?;

        let stored = self.registry.get_refresh(claimed.subject_id).await?;
        let matches = stored
            .as_deref()
            .is_some_and(|live| bool::from(live.as_bytes().ct_eq(presented.as_bytes())));
        if !matches {
            warn!(
                subject_id = %claimed.subject_id,
                entry_present = stored.is_some(),
                "Refresh token does not match the live entry"
            );
            return Err(IdentityError::InvalidRefreshToken);
        }

        // Claims are re-read so role and email changes reach the new pair
        let account = self
            .store
            .find_by_subject_id(claimed.subject_id)
            .await?
            .ok_or(IdentityError::InvalidRefreshToken)?;

        let tokens = self.start_session(&account.identity()).await?;
        debug!(subject_id = %account.id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Revoke the subject for the token's remaining lifetime and drop its refresh entry
    ///
    /// An expired but correctly signed token still logs out: no revocation
    /// entry is written since nothing is left to block.
    pub async fn logout(&self, access_token: &str) -> Result<()> {
        let claims = self
            .signer
            .decode_ignoring_expiry(access_token, TokenKind::Access)?;
        let identity = claims.identity()?;

        match claims.remaining_lifetime(self.clock.now()) {
            Some(remaining) => {
                self.registry
                    .revoke(identity.subject_id, access_token, remaining)
                    .await?;
            }
            None => debug!(subject_id = %identity.subject_id, "Logout with expired token"),
        }
        self.registry.delete_refresh(identity.subject_id).await?;

        info!(subject_id = %identity.subject_id, "Logged out");
        Ok(())
    }

    /// Read path for every protected request
    pub async fn authorize(&self, access_token: &str) -> Result<Identity> {
        let identity = self.signer.verify(access_token, TokenKind::Access)?;
        if self.registry.is_revoked(identity.subject_id).await? {
            return Err(IdentityError::RevokedToken);
        }
        Ok(identity)
    }

    async fn start_session(&self, identity: &Identity) -> Result<TokenPair> {
        let access_token = self.signer.issue_access(identity)?;
        let refresh_token = self.signer.issue_refresh(identity)?;
        self.registry
            .set_refresh(identity.subject_id, &refresh_token, self.refresh_ttl)
            .await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
