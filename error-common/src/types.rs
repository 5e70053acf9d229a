use thiserror::Error;

/// Process-level failures surfaced by binaries at startup and shutdown
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network communication errors (bind, accept)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database connection or migration errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Session registry (Redis) connection errors
    #[error("Session registry error: {0}")]
    RegistryError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError(_) => 78,
            Self::NetworkError(_) => 74,
            Self::DatabaseError(_) | Self::RegistryError(_) => 69,
            Self::ServerError(_) | Self::InternalError(_) | Self::Other(_) => 70,
        }
    }
}

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Log a process-level error with its context label
pub fn log_error(context: &str, error: &ServiceError) {
    tracing::error!(
        context = context,
        error = %error,
        exit_code = error.exit_code(),
        "Service error occurred"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_failure_class() {
        assert_eq!(ServiceError::ConfigError("x".into()).exit_code(), 78);
        assert_eq!(ServiceError::RegistryError("x".into()).exit_code(), 69);
        assert_eq!(ServiceError::DatabaseError("x".into()).exit_code(), 69);
        assert_eq!(
            ServiceError::from(anyhow::anyhow!("boom")).exit_code(),
            70
        );
    }

    #[test]
    fn test_display_includes_category() {
        let err = ServiceError::NetworkError("address in use".into());
        assert_eq!(err.to_string(), "Network error: address in use");
    }
}
