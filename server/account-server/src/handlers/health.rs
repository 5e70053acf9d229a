use crate::db;
use crate::server::AccountServer;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub message: String,
    pub timestamp: String,
    pub version: String,
    /// Seconds since startup
    pub uptime: u64,
    /// Component name to `healthy` / `unhealthy`
    pub checks: BTreeMap<String, String>,
}

fn status(ok: bool) -> String {
    let label = if ok { "healthy" } else { "unhealthy" };
    label.to_string()
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Server and its dependencies are reachable", body = HealthResponse),
        (status = 503, description = "A dependency is unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(server): State<AccountServer>) -> (StatusCode, Json<HealthResponse>) {
    let mut checks = BTreeMap::new();

    let registry_ok = match server.registry.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Session registry health check failed");
            false
        }
    };
    checks.insert("session_registry".to_string(), status(registry_ok));

    let mut database_ok = true;
    if let Some(pool) = &server.database {
        if let Err(e) = db::ping(pool).await {
            warn!(error = %e, "Database health check failed");
            database_ok = false;
        }
        checks.insert("database".to_string(), status(database_ok));
    }

    let healthy = registry_ok && database_ok;
    let response = HealthResponse {
        message: if healthy {
            "Server is running successfully"
        } else {
            "Server is running with degraded dependencies"
        }
        .to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: server.uptime_seconds(),
        checks,
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
