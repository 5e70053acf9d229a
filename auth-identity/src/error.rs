use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not verified")]
    UnverifiedAccount,

    #[error("Account has no password credential")]
    OAuthOnlyAccount,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Token revoked")]
    RevokedToken,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Cannot delete your own account")]
    SelfDeletion,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Session registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IdentityError {
    /// Login failures that must look identical to the caller
    pub fn is_login_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::UnverifiedAccount | Self::OAuthOnlyAccount
        )
    }

    /// Collaborator outages, surfaced as a server-error class
    pub fn is_outage(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::RegistryUnavailable(_))
    }
}

impl From<redis::RedisError> for IdentityError {
    fn from(err: redis::RedisError) -> Self {
        Self::RegistryUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
