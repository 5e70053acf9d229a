//! Account Service - HTTP API for user accounts
//!
//! Registration, login with access and refresh tokens, Google sign-in,
//! profile self-service and user administration, built on the session
//! lifecycle in `auth_identity` and the authorization gate in `auth_gateway`.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::*;
pub use server::{AccountServer, ServerParts};

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

/// Create the main application router with all routes and middleware
pub fn create_app(server: AccountServer) -> Router {
    let images = ServeDir::new(server.config.profile_image_dir());

    routes::create_routes(&server)
        .nest_service(routes::paths::PROFILE_IMAGES, images)
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.config.client_url)),
        )
        .with_state(server)
}

/// Browser access is limited to the configured client origin
fn cors_layer(client_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match client_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(client_url = %client_url, error = %e, "Invalid CLIENT_URL, cross-origin requests disabled");
            layer
        }
    }
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        MessageResponse::new("Route not found"),
    )
}
