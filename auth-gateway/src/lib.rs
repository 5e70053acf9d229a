pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::*;
pub use extractors::*;
pub use middleware::*;

/// Authorization gate for the account service HTTP surface
///
/// Every protected route passes through [`require_auth`], which reads the
/// `Authorization: Bearer <token>` header, asks the session manager to
/// authorize it, and attaches the resolved [`auth_identity::Identity`] to the
/// request extensions. [`optional_auth`] does the same without ever blocking,
/// and [`require_role`] layers a role check on top.
///
/// Rejections carry a fixed `{message, status}` body and never echo token
/// contents or the underlying verification failure.
///
/// # Example
///
/// ```rust,no_run
/// use auth_gateway::{require_auth, require_role, AuthGate, CurrentIdentity, RoleGuard};
/// use auth_identity::Role;
/// use axum::{middleware, routing::get, Router};
///
/// fn admin_routes(gate: AuthGate) -> Router {
///     Router::new()
///         .route("/users", get(|CurrentIdentity(identity): CurrentIdentity| async move {
///             identity.email
///         }))
///         .layer(middleware::from_fn_with_state(RoleGuard::only(Role::Admin), require_role))
///         .layer(middleware::from_fn_with_state(gate, require_auth))
/// }
/// ```
pub const BEARER_PREFIX: &str = "Bearer ";
