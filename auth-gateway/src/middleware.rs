//! Authorization middleware for Axum
//!
//! Resolves bearer tokens through the session manager and injects the
//! resulting `Identity` into request extensions for downstream handlers.

use crate::error::GateError;
use crate::BEARER_PREFIX;
use auth_identity::{AuthSessionManager, Identity, IdentityError, Role};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Shared gate state
#[derive(Clone)]
pub struct AuthGate {
    sessions: Arc<AuthSessionManager>,
}

impl AuthGate {
    pub fn new(sessions: Arc<AuthSessionManager>) -> Self {
        Self { sessions }
    }

    /// Authorize the bearer token carried by `headers`
    pub async fn authorize_headers(&self, headers: &HeaderMap) -> Result<Identity, GateError> {
        let token = bearer_token(headers).ok_or(GateError::MissingToken)?;

        self.sessions.authorize(token).await.map_err(|e| match e {
            IdentityError::RevokedToken => GateError::RevokedToken,
            e if e.is_outage() => {
                tracing::error!(error = %e, "Authorization check could not reach the registry");
                GateError::Unavailable
            }
            _ => GateError::InvalidToken,
        })
    }
}

/// Reject the request unless it carries a valid, unrevoked access token
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, GateError> {
    let identity = gate.authorize_headers(request.headers()).await?;

    tracing::debug!(
        subject_id = %identity.subject_id,
        role = %identity.role,
        "Request authenticated"
    );
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Attach the identity when the token is valid; never blocks
pub async fn optional_auth(
    State(gate): State<AuthGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if bearer_token(request.headers()).is_some() {
        if let Ok(identity) = gate.authorize_headers(request.headers()).await {
            request.extensions_mut().insert(identity);
        }
    }

    next.run(request).await
}

/// Roles allowed through `require_role`
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Arc<[Role]>,
}

impl RoleGuard {
    pub fn only(role: Role) -> Self {
        Self::any_of(&[role])
    }

    pub fn any_of(roles: &[Role]) -> Self {
        Self {
            allowed: Arc::from(roles),
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }
}

/// Must run after `require_auth`: 401 without an identity, 403 on the wrong role
pub async fn require_role(
    State(guard): State<RoleGuard>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, GateError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or(GateError::Unauthenticated)?;

    if !guard.allows(identity.role) {
        tracing::warn!(
            subject_id = %identity.subject_id,
            role = %identity.role,
            required_roles = ?guard.allowed,
            "Role check failed"
        );
        return Err(GateError::Forbidden);
    }

    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
