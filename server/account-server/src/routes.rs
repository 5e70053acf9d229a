pub mod paths;

use crate::{
    handlers::{admin, auth, health, users},
    openapi,
    server::AccountServer,
    services::images::MAX_IMAGE_BYTES,
};
use auth_gateway::{optional_auth, require_auth, require_role, RoleGuard};
use auth_identity::Role;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

/// Room for multipart framing around a maximum-size image
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Create health check routes
pub fn health_routes() -> Router<AccountServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Create authentication routes
///
/// Logout is not behind the gate: the session manager checks the token so
/// that an expired one can still end its session.
pub fn auth_routes(server: &AccountServer) -> Router<AccountServer> {
    use paths::auth as p;

    let session = Router::new()
        .route(p::SESSION, get(auth::session))
        .layer(from_fn_with_state(server.gate.clone(), optional_auth));

    Router::new()
        .route(p::REGISTER, post(auth::register))
        .route(p::LOGIN, post(auth::login))
        .route(p::VERIFY_EMAIL, get(auth::verify_email))
        .route(p::FORGOT_PASSWORD, post(auth::forgot_password))
        .route(p::RESET_PASSWORD, post(auth::reset_password))
        .route(p::REFRESH_TOKEN, post(auth::refresh_token))
        .route(p::LOGOUT, post(auth::logout))
        .route(p::GOOGLE, get(auth::google_login))
        .route(p::GOOGLE_CALLBACK, get(auth::google_callback))
        .merge(session)
}

/// Create self-service routes for the signed-in user
pub fn user_routes(server: &AccountServer) -> Router<AccountServer> {
    use paths::user as p;

    Router::new()
        .route(p::PROFILE, get(users::get_profile).put(users::update_profile))
        .route(
            p::PROFILE_IMAGE,
            post(users::upload_profile_image)
                .delete(users::delete_profile_image)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(p::CHANGE_PASSWORD, post(users::change_password))
        .route(p::DELETE_ACCOUNT, delete(users::delete_account))
        .layer(from_fn_with_state(server.gate.clone(), require_auth))
}

/// Create user administration routes
pub fn admin_routes(server: &AccountServer) -> Router<AccountServer> {
    use paths::admin as p;

    Router::new()
        .route(p::USERS, get(admin::list_users))
        .route(p::USER_BY_ID, get(admin::get_user).delete(admin::delete_user))
        .route(p::USER_ROLE, put(admin::update_user_role))
        // The last layer runs first: authentication, then the role check
        .layer(from_fn_with_state(RoleGuard::only(Role::Admin), require_role))
        .layer(from_fn_with_state(server.gate.clone(), require_auth))
}

/// All `/api` routes
pub fn api_routes(server: &AccountServer) -> Router<AccountServer> {
    Router::new()
        .merge(health_routes())
        .nest(paths::auth::BASE, auth_routes(server))
        .nest(paths::user::BASE, user_routes(server))
        .nest(paths::admin::BASE, admin_routes(server))
}

/// Create the complete route tree
pub fn create_routes(server: &AccountServer) -> Router<AccountServer> {
    Router::new()
        .nest(paths::API, api_routes(server))
        .merge(openapi::create_docs_routes())
}
