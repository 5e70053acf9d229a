/// Postgres-backed credential store
///
/// Runtime-checked queries against the `users` table created by
/// `migrations/0001_users.sql`. Connectivity failures surface as
/// `StoreUnavailable`; a unique-email violation as `EmailAlreadyInUse`.
use async_trait::async_trait;
use auth_identity::{
    normalize_email, Account, AccountPage, AccountQuery, CredentialStore, IdentityError, Result,
    Role,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, role, is_verified, \
     verification_token, reset_password_token, reset_password_expires, google_id, \
     profile_image, created_at, updated_at";

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: Option<String>,
    role: String,
    is_verified: bool,
    verification_token: Option<String>,
    reset_password_token: Option<String>,
    reset_password_expires: Option<DateTime<Utc>>,
    google_id: Option<String>,
    profile_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Account {
    type Error = IdentityError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Account {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>()?,
            is_verified: row.is_verified,
            verification_token: row.verification_token,
            reset_password_token: row.reset_password_token,
            reset_password_expires: row.reset_password_expires,
            google_id: row.google_id,
            profile_image: row.profile_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn store_error(err: sqlx::Error) -> IdentityError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return IdentityError::EmailAlreadyInUse;
        }
    }
    error!(error = %err, "Credential store query failed");
    IdentityError::StoreUnavailable(err.to_string())
}

/// `%term%` with LIKE metacharacters escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one_by(&self, clause: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Account::try_from)
            .transpose()
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.fetch_one_by("LOWER(email) = $1", &normalize_email(email))
            .await
    }

    async fn find_by_subject_id(&self, id: Uuid) -> Result<Option<Account>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_by_external_subject(&self, external_id: &str) -> Result<Option<Account>> {
        self.fetch_one_by("google_id = $1", external_id).await
    }

    async fn insert(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO users (
                id, first_name, last_name, email, password_hash, role, is_verified,
                verification_token, reset_password_token, reset_password_expires,
                google_id, profile_image, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(account.id)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(normalize_email(&account.email))
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_verified)
        .bind(&account.verification_token)
        .bind(&account.reset_password_token)
        .bind(account.reset_password_expires)
        .bind(&account.google_id)
        .bind(&account.profile_image)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                first_name = $2, last_name = $3, email = $4, password_hash = $5, role = $6,
                is_verified = $7, verification_token = $8, reset_password_token = $9,
                reset_password_expires = $10, google_id = $11, profile_image = $12,
                updated_at = $13
            WHERE id = $1
            ",
        )
        .bind(account.id)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(normalize_email(&account.email))
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_verified)
        .bind(&account.verification_token)
        .bind(&account.reset_password_token)
        .bind(account.reset_password_expires)
        .bind(&account.google_id)
        .bind(&account.profile_image)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::AccountNotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_verified(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET is_verified = TRUE, verification_token = NULL, updated_at = NOW()
            WHERE verification_token = $1
            ",
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET reset_password_token = $2, reset_password_expires = $3
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::AccountNotFound);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        // Single statement so two concurrent resets cannot both win
        let sql = format!(
            r"
            UPDATE users
            SET reset_password_token = NULL, reset_password_expires = NULL
            WHERE reset_password_token = $1 AND reset_password_expires > $2
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?
            .map(Account::try_from)
            .transpose()
    }

    async fn list(&self, query: &AccountQuery) -> Result<AccountPage> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let filter = "($1::text IS NULL OR first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {filter} \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&pattern)
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(AccountPage {
            accounts: rows
                .into_iter()
                .map(Account::try_from)
                .collect::<Result<Vec<_>>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

/// Liveness probe for the health endpoint
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(store_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_row_conversion_rejects_unknown_role() {
        let now = Utc::now();
        let row = |role: &str| UserRow {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: None,
            role: role.into(),
            is_verified: true,
            verification_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            google_id: Some("g-1".into()),
            profile_image: None,
            created_at: now,
            updated_at: now,
        };

        let account = Account::try_from(row("admin")).unwrap();
        assert_eq!(account.role, Role::Admin);
        assert_eq!(account.google_id.as_deref(), Some("g-1"));
        assert!(matches!(
            Account::try_from(row("superuser")),
            Err(IdentityError::InvalidRole(_))
        ));
    }
}
