use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Invalid or expired state parameter")]
    InvalidState,

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Provider email is not verified")]
    UnverifiedEmail,

    #[error("Provider profile is missing {0}")]
    IncompleteProfile(&'static str),

    #[error("External provider error: {0}")]
    ExternalProviderError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, OAuthError>;
