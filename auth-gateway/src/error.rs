use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token revoked")]
    RevokedToken,

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Session registry unavailable")]
    Unavailable,
}

impl GateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::MissingToken
            | GateError::InvalidToken
            | GateError::RevokedToken
            | GateError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateError::Forbidden => StatusCode::FORBIDDEN,
            GateError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GateError::MissingToken => "Access denied. No token provided.",
            GateError::InvalidToken => "Token is not valid.",
            GateError::RevokedToken => "Token revoked. Please log in again.",
            GateError::Unauthenticated => "Authentication required.",
            GateError::Forbidden => "Access denied. Insufficient permissions.",
            GateError::Unavailable => "Service temporarily unavailable.",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "message": self.message(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
