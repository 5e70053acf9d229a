use crate::error::IdentityError;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(IdentityError::InvalidRole(other.to_string())),
        }
    }
}

/// Minimal claim set carried by every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub subject_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Credential-store record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Absent for accounts created through OAuth
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub google_id: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Unverified password account awaiting email confirmation
    pub fn new_local(
        first_name: String,
        last_name: String,
        email: &str,
        password_hash: String,
        verification_token: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email: normalize_email(email),
            password_hash: Some(password_hash),
            role: Role::User,
            is_verified: false,
            verification_token: Some(verification_token),
            reset_password_token: None,
            reset_password_expires: None,
            google_id: None,
            profile_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Verified account without a password, linked to an external subject
    pub fn new_external(
        external_subject_id: String,
        first_name: String,
        last_name: String,
        email: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email: normalize_email(email),
            password_hash: None,
            role: Role::User,
            is_verified: true,
            verification_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            google_id: Some(external_subject_id),
            profile_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile::from(self)
    }
}

/// Public projection of an account; never carries hashes or one-time tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            role: account.role,
            is_verified: account.is_verified,
            google_id: account.google_id.clone(),
            profile_image: account.profile_image.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Admin listing query; `page` is 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl AccountQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Case-insensitive match over first name, last name and email
    pub fn matches(&self, account: &Account) -> bool {
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                account.first_name.to_lowercase().contains(&term)
                    || account.last_name.to_lowercase().contains(&term)
                    || account.email.to_lowercase().contains(&term)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub total: u64,
}

/// Emails are stored and looked up lowercased and trimmed
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 32 random bytes as lowercase hex, used for verification and reset links
pub fn generate_one_time_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(first: &str, last: &str, email: &str) -> Account {
        Account::new_local(
            first.into(),
            last.into(),
            email,
            "hash".into(),
            "token".into(),
            Utc::now(),
        )
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!(matches!(
            "root".parse::<Role>(),
            Err(IdentityError::InvalidRole(_))
        ));
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_profile_hides_secrets() {
        let account = sample("Ada", "Lovelace", "Ada@Example.com ");
        assert_eq!(account.email, "ada@example.com");

        let json = serde_json::to_value(account.profile()).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["role"], "user");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("verificationToken").is_none());
    }

    #[test]
    fn test_query_matching_and_offset() {
        let account = sample("Grace", "Hopper", "grace@navy.mil");
        let query = |search: Option<&str>| AccountQuery {
            page: 3,
            limit: 10,
            search: search.map(str::to_string),
        };

        assert!(query(None).matches(&account));
        assert!(query(Some("HOP")).matches(&account));
        assert!(query(Some("navy")).matches(&account));
        assert!(!query(Some("turing")).matches(&account));
        assert_eq!(query(None).offset(), 20);
    }

    #[test]
    fn test_one_time_token_shape() {
        let token = generate_one_time_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_one_time_token());
    }
}
