use auth_identity::IdentityError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::codes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type
    pub error_type: String,
    /// Stable machine-readable code
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Plain `{message}` body used by success responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        code: &'static str,
        field_errors: Option<HashMap<String, Vec<String>>>,
    },

    #[error("{message}")]
    Authentication { message: String, code: &'static str },

    #[error("{message}")]
    Authorization { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    BadRequest { message: String, code: &'static str },

    #[error("Service unavailable: {detail}")]
    ServiceUnavailable { detail: String, code: &'static str },

    #[error("Internal server error: {detail}")]
    Internal { detail: String },
}

impl ApiError {
    /// Create a validation error with field-specific errors
    pub fn validation_with_fields(field_errors: HashMap<String, Vec<String>>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            code: codes::validation::INVALID_INPUT,
            field_errors: Some(field_errors),
        }
    }

    /// Create a simple validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: codes::validation::INVALID_INPUT,
            field_errors: None,
        }
    }

    pub fn authentication(message: impl Into<String>, code: &'static str) -> Self {
        Self::Authentication {
            message: message.into(),
            code,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, code: &'static str) -> Self {
        Self::BadRequest {
            message: message.into(),
            code,
        }
    }

    /// Internal failure; `detail` is logged, never returned
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { code, .. }
            | ApiError::Authentication { code, .. }
            | ApiError::BadRequest { code, .. }
            | ApiError::ServiceUnavailable { code, .. } => code,
            ApiError::Authorization { .. } => codes::authorization::INSUFFICIENT_PERMISSIONS,
            ApiError::NotFound { .. } => codes::account::NOT_FOUND,
            ApiError::Internal { .. } => codes::infrastructure::INTERNAL,
        }
    }

    /// Message safe to return to the caller
    fn public_message(&self) -> String {
        match self {
            ApiError::ServiceUnavailable { .. } => "Service temporarily unavailable".to_string(),
            ApiError::Internal { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        // Log the error with correlation ID
        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %logger_redacted::redact(&self.to_string()),
                "API error occurred"
            );
        } else {
            debug!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                "Request rejected"
            );
        }

        let field_errors = match &self {
            ApiError::Validation { field_errors, .. } => field_errors.clone(),
            _ => None,
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            message: self.public_message(),
            field_errors,
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        use codes::{account, authentication, infrastructure, validation};

        if err.is_login_rejection() {
            return ApiError::authentication(
                "Invalid email or password",
                authentication::INVALID_CREDENTIALS,
            );
        }

        match err {
            IdentityError::InvalidToken => {
                ApiError::authentication("Token is not valid.", authentication::TOKEN_INVALID)
            }
            IdentityError::InvalidRefreshToken => ApiError::authentication(
                "Invalid refresh token",
                authentication::REFRESH_TOKEN_INVALID,
            ),
            IdentityError::RevokedToken => ApiError::authentication(
                "Token revoked. Please log in again.",
                authentication::TOKEN_REVOKED,
            ),
            IdentityError::AccountNotFound => ApiError::not_found("User not found"),
            IdentityError::EmailAlreadyInUse => {
                ApiError::bad_request("Email already in use", account::EMAIL_IN_USE)
            }
            IdentityError::InvalidVerificationToken => ApiError::bad_request(
                "Invalid or expired verification token",
                account::VERIFICATION_TOKEN_INVALID,
            ),
            IdentityError::InvalidResetToken => ApiError::bad_request(
                "Invalid or expired reset token",
                account::RESET_TOKEN_INVALID,
            ),
            IdentityError::IncorrectPassword => ApiError::bad_request(
                "Current password is incorrect",
                account::PASSWORD_INCORRECT,
            ),
            IdentityError::SelfDeletion => {
                ApiError::bad_request("Cannot delete your own account", account::SELF_DELETION)
            }
            IdentityError::InvalidRole(_) => {
                ApiError::bad_request("Invalid role", validation::INVALID_INPUT)
            }
            IdentityError::WeakPassword(message) => ApiError::Validation {
                message: "Validation failed".to_string(),
                code: validation::WEAK_PASSWORD,
                field_errors: Some(HashMap::from([("password".to_string(), vec![message])])),
            },
            IdentityError::InvalidImage(message) => {
                ApiError::bad_request(message, validation::INVALID_FILE)
            }
            IdentityError::StoreUnavailable(detail) => ApiError::ServiceUnavailable {
                detail,
                code: infrastructure::STORE_UNAVAILABLE,
            },
            IdentityError::RegistryUnavailable(detail) => ApiError::ServiceUnavailable {
                detail,
                code: infrastructure::REGISTRY_UNAVAILABLE,
            },
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| e.code.to_string(), ToString::to_string)
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ApiError::validation_with_fields(field_errors)
    }
}

/// Convert anyhow errors to API errors
impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::internal(format!("{error:#}"))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_rejections_collapse() {
        for err in [
            IdentityError::InvalidCredentials,
            IdentityError::UnverifiedAccount,
            IdentityError::OAuthOnlyAccount,
        ] {
            let api = ApiError::from(err);
            assert_eq!(api.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(api.to_string(), "Invalid email or password");
            assert_eq!(api.error_code(), codes::authentication::INVALID_CREDENTIALS);
        }
    }

    #[test]
    fn test_outages_are_server_errors_without_detail() {
        let api = ApiError::from(IdentityError::RegistryUnavailable("connection refused".into()));
        assert_eq!(api.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.public_message(), "Service temporarily unavailable");

        let api = ApiError::from(IdentityError::Hashing("argon2 exploded".into()));
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.public_message().contains("argon2"));
    }

    #[test]
    fn test_weak_password_is_field_error() {
        let api = ApiError::from(IdentityError::WeakPassword("Password must contain a number".into()));
        match api {
            ApiError::Validation { field_errors: Some(fields), code, .. } => {
                assert_eq!(code, codes::validation::WEAK_PASSWORD);
                assert_eq!(fields["password"], vec!["Password must contain a number"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
