use crate::error::{ApiError, ApiResult, MessageResponse};
use crate::handlers::common::ValidatedJson;
use crate::server::AccountServer;
use crate::services::Registration;
use crate::utils::run_detached;
use auth_gateway::{bearer_token, MaybeIdentity};
use auth_identity::{AccountProfile, Identity, PasswordCredentials, TokenPair};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    Json,
};
use error_common::codes;
use logger_redacted::redacted_warn;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub last_name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyEmailParams {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declines
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = RegisterResponse),
        (status = 400, description = "Validation failed or email already in use", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(server): State<AccountServer>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let user = server
        .accounts
        .register(Registration {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully. Please check your email for verification."
                .to_string(),
            user,
        }),
    ))
}

/// Password login
///
/// Unknown email, wrong password, unverified and Google-only accounts all
/// answer the same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = crate::error::ApiErrorResponse),
        (status = 503, description = "Session registry unavailable", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(server): State<AccountServer>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let sessions = server.sessions.clone();
    let credentials = PasswordCredentials {
        email: body.email,
        password: body.password,
    };
    let session = run_detached(async move { sessions.login(&credentials).await }).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token: session.tokens.access_token,
        refresh_token: session.tokens.refresh_token,
        user: session.profile,
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify-email",
    params(VerifyEmailParams),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired verification token", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    State(server): State<AccountServer>,
    Query(params): Query<VerifyEmailParams>,
) -> ApiResult<Json<MessageResponse>> {
    let token = params.token.unwrap_or_default();
    server.accounts.verify_email(token.trim()).await?;
    Ok(MessageResponse::new("Email verified successfully"))
}

/// Always answers the same message so callers cannot probe for accounts
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(server): State<AccountServer>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    server.accounts.forgot_password(&body.email).await?;
    Ok(MessageResponse::new(
        "If the email exists, a password reset link has been sent.",
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(server): State<AccountServer>,
    ValidatedJson(body): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    server
        .accounts
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(MessageResponse::new("Password reset successfully"))
}

/// Rotate the refresh token; the presented one stops working
#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 400, description = "Refresh token required", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(server): State<AccountServer>,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<Json<TokenPair>> {
    let presented = body
        .and_then(|Json(body)| body.refresh_token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::bad_request("Refresh token required", codes::validation::MISSING_REQUIRED_FIELD)
        })?;

    let sessions = server.sessions.clone();
    let tokens = run_detached(async move { sessions.refresh(&presented).await }).await?;
    Ok(Json(tokens))
}

/// Revoke the caller's session
///
/// The bearer token is checked by the session manager rather than the gate,
/// so an expired token can still log out. No token at all is a no-op.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Token is not valid", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    State(server): State<AccountServer>,
    headers: HeaderMap,
) -> ApiResult<Json<MessageResponse>> {
    if let Some(token) = bearer_token(&headers) {
        let sessions = server.sessions.clone();
        let token = token.to_string();
        run_detached(async move { sessions.logout(&token).await }).await?;
    }
    Ok(MessageResponse::new("Logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Whether the caller holds a valid access token", body = SessionResponse)
    ),
    tag = "auth",
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn session(MaybeIdentity(identity): MaybeIdentity) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: identity.is_some(),
        identity,
    })
}

/// Redirect to Google's consent screen
#[utoipa::path(
    get,
    path = "/api/auth/google",
    responses(
        (status = 303, description = "Redirect to the provider"),
        (status = 404, description = "Google sign-in is not configured", body = crate::error::ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn google_login(State(server): State<AccountServer>) -> ApiResult<Redirect> {
    let provider = server
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Google sign-in is not configured"))?;

    let request = provider.authorization_url().await.map_err(|e| {
        warn!(provider = provider.name(), error = %e, "Failed to start OAuth handshake");
        ApiError::internal(e.to_string())
    })?;
    Ok(Redirect::to(&request.url))
}

/// Finish the Google handshake and hand tokens to the browser app
#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    params(OAuthCallbackParams),
    responses(
        (status = 303, description = "Redirect to the client with tokens, or to the login page with an error")
    ),
    tag = "auth"
)]
pub async fn google_callback(
    State(server): State<AccountServer>,
    Query(params): Query<OAuthCallbackParams>,
) -> Redirect {
    let client_url = server.config.client_url.trim_end_matches('/').to_string();
    match complete_google_login(&server, params).await {
        Ok(tokens) => Redirect::to(&format!(
            "{client_url}/oauth-success?token={}&refreshToken={}",
            tokens.access_token, tokens.refresh_token
        )),
        Err(e) => {
            redacted_warn!("OAuth login failed: {e:#}");
            Redirect::to(&format!("{client_url}/login?error=authentication_failed"))
        }
    }
}

async fn complete_google_login(
    server: &AccountServer,
    params: OAuthCallbackParams,
) -> anyhow::Result<TokenPair> {
    let provider = server
        .oauth
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Google sign-in is not configured"))?;
    if let Some(error) = params.error {
        anyhow::bail!("provider returned error: {error}");
    }
    let (Some(code), Some(state)) = (params.code, params.state) else {
        anyhow::bail!("callback without code or state");
    };

    let profile = provider.resolve(&code, &state).await?;
    let account = server.accounts.resolve_oauth_account(&profile).await?;
    let identity = account.identity();

    let sessions = server.sessions.clone();
    let tokens =
        run_detached(async move { sessions.complete_oauth_login(&identity).await }).await?;

    info!(subject_id = %account.id, provider = provider.name(), "OAuth sign-in");
    Ok(tokens)
}
