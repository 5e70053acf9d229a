use crate::error::{IdentityError, Result};
use crate::identity::{normalize_email, Account, AccountPage, AccountQuery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence boundary for account records
///
/// Implementations map connectivity failures to
/// [`IdentityError::StoreUnavailable`]. Email lookups are case-insensitive.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn find_by_subject_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Lookup by OAuth provider subject
    async fn find_by_external_subject(&self, external_id: &str) -> Result<Option<Account>>;

    /// Fails with `EmailAlreadyInUse` on a duplicate email
    async fn insert(&self, account: &Account) -> Result<()>;

    /// Replace the stored record; `AccountNotFound` if it vanished
    async fn update(&self, account: &Account) -> Result<()>;

    /// Returns whether a record was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Mark the account holding `token` as verified and clear the token
    async fn mark_verified(&self, token: &str) -> Result<bool>;

    async fn set_reset_token(&self, id: Uuid, token: &str, expires_at: DateTime<Utc>)
        -> Result<()>;

    /// Clear and return the account whose reset token matches and is unexpired at `now`
    async fn consume_reset_token(&self, token: &str, now: DateTime<Utc>)
        -> Result<Option<Account>>;

    /// Newest first
    async fn list(&self, query: &AccountQuery) -> Result<AccountPage>;
}

/// Process-local store for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

fn email_taken(accounts: &HashMap<Uuid, Account>, email: &str, except: Uuid) -> bool {
    let email = normalize_email(email);
    accounts
        .values()
        .any(|existing| existing.id != except && existing.email == email)
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let email = normalize_email(email);
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_subject_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_external_subject(&self, external_id: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| account.google_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if email_taken(&accounts, &account.email, account.id) {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if !accounts.contains_key(&account.id) {
            return Err(IdentityError::AccountNotFound);
        }
        if email_taken(&accounts, &account.email, account.id) {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }

    async fn mark_verified(&self, token: &str) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts
            .values_mut()
            .find(|account| account.verification_token.as_deref() == Some(token))
        {
            Some(account) => {
                account.is_verified = true;
                account.verification_token = None;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(IdentityError::AccountNotFound)?;
        account.reset_password_token = Some(token.to_string());
        account.reset_password_expires = Some(expires_at);
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.values_mut().find(|account| {
            account.reset_password_token.as_deref() == Some(token)
                && account.reset_password_expires.is_some_and(|expires| expires > now)
        }) else {
            return Ok(None);
        };
        account.reset_password_token = None;
        account.reset_password_expires = None;
        Ok(Some(account.clone()))
    }

    async fn list(&self, query: &AccountQuery) -> Result<AccountPage> {
        let accounts = self.accounts.read().await;
        let mut matching: Vec<&Account> = accounts
            .values()
            .filter(|account| query.matches(account))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(AccountPage {
            accounts: page,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account(email: &str, created_at: DateTime<Utc>) -> Account {
        Account::new_local(
            "Test".into(),
            "User".into(),
            email,
            "hash".into(),
            format!("verify-{email}"),
            created_at,
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = InMemoryCredentialStore::new();
        store.insert(&account("a@example.com", Utc::now())).await.unwrap();

        let err = store
            .insert(&account("A@Example.com", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailAlreadyInUse));
        assert!(store.find_by_email("A@EXAMPLE.COM").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_verified_consumes_token() {
        let store = InMemoryCredentialStore::new();
        let record = account("a@example.com", Utc::now());
        store.insert(&record).await.unwrap();

        assert!(store.mark_verified("verify-a@example.com").await.unwrap());
        assert!(!store.mark_verified("verify-a@example.com").await.unwrap());

        let stored = store.find_by_subject_id(record.id).await.unwrap().unwrap();
        assert!(stored.is_verified);
        assert!(stored.verification_token.is_none());
    }

    #[tokio::test]
    async fn test_reset_token_expiry() {
        let store = InMemoryCredentialStore::new();
        let record = account("a@example.com", Utc::now());
        store.insert(&record).await.unwrap();

        let now = Utc::now();
        store
            .set_reset_token(record.id, "reset", now + Duration::hours(1))
            .await
            .unwrap();

        assert!(store
            .consume_reset_token("reset", now + Duration::hours(2))
            .await
            .unwrap()
            .is_none());
        let consumed = store.consume_reset_token("reset", now).await.unwrap().unwrap();
        assert_eq!(consumed.id, record.id);
        assert!(consumed.reset_password_token.is_none());
        assert!(store.consume_reset_token("reset", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_paginates() {
        let store = InMemoryCredentialStore::new();
        let start = Utc::now();
        for i in 0..12 {
            store
                .insert(&account(&format!("user{i}@example.com"), start + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let first = store
            .list(&AccountQuery { page: 1, limit: 10, search: None })
            .await
            .unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.accounts.len(), 10);
        assert_eq!(first.accounts[0].email, "user11@example.com");

        let second = store
            .list(&AccountQuery { page: 2, limit: 10, search: None })
            .await
            .unwrap();
        assert_eq!(second.accounts.len(), 2);

        let searched = store
            .list(&AccountQuery { page: 1, limit: 10, search: Some("USER1".into()) })
            .await
            .unwrap();
        // user1, user10, user11
        assert_eq!(searched.total, 3);
    }
}
