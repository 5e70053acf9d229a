use crate::routes::paths;
use crate::server::AccountServer;
use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::handlers::health::health_check,

        // Authentication endpoints
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::verify_email,
        crate::handlers::auth::forgot_password,
        crate::handlers::auth::reset_password,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::logout,
        crate::handlers::auth::session,
        crate::handlers::auth::google_login,
        crate::handlers::auth::google_callback,

        // Self-service endpoints
        crate::handlers::users::get_profile,
        crate::handlers::users::update_profile,
        crate::handlers::users::upload_profile_image,
        crate::handlers::users::delete_profile_image,
        crate::handlers::users::change_password,
        crate::handlers::users::delete_account,

        // Administration endpoints
        crate::handlers::admin::list_users,
        crate::handlers::admin::get_user,
        crate::handlers::admin::update_user_role,
        crate::handlers::admin::delete_user,
    ),
    components(
        schemas(
            // Shared schemas
            crate::error::ApiErrorResponse,
            crate::error::MessageResponse,
            crate::types::Pagination,
            auth_identity::AccountProfile,
            auth_identity::Identity,
            auth_identity::Role,
            auth_identity::TokenPair,

            // Health schemas
            crate::handlers::health::HealthResponse,

            // Authentication schemas
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::RegisterResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::ForgotPasswordRequest,
            crate::handlers::auth::ResetPasswordRequest,
            crate::handlers::auth::RefreshRequest,
            crate::handlers::auth::SessionResponse,

            // User schemas
            crate::handlers::users::UpdateProfileRequest,
            crate::handlers::users::ChangePasswordRequest,
            crate::handlers::users::DeleteAccountRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::users::ProfileImageResponse,

            // Admin schemas
            crate::handlers::admin::UserListResponse,
            crate::handlers::admin::UpdateRoleRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Registration, login, token refresh, logout and Google sign-in"),
        (name = "user", description = "Profile, profile image, password and account self-service"),
        (name = "admin", description = "User administration (admin role)"),
    ),
    info(
        title = "Account Service API",
        version = "0.1.0",
        description = "User accounts with JWT access and refresh tokens, a shared session registry and role-based administration.",
    ),
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create OpenAPI documentation routes
pub fn create_docs_routes() -> Router<AccountServer> {
    Router::new().route(
        paths::docs::OPENAPI_JSON,
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/health",
            "/api/auth/login",
            "/api/auth/refresh-token",
            "/api/auth/logout",
            "/api/user/profile",
            "/api/user/profile/image",
            "/api/admin/users",
            "/api/admin/users/{id}",
            "/api/admin/users/{id}/role",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("AccountProfile"));
    }
}
