//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes liveness and readiness checks.
//!
//! - GET /health/live - Liveness check (process is alive)
//! - GET /health/ready - Readiness check (data directory is readable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness check.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness check.
/// Returns 200 if the data directory can be listed.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_data_dir(&state) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let data_dir_ok = check_data_dir(&state);

    Json(HealthResponse {
        status: if data_dir_ok { "healthy" } else { "unhealthy" }.to_string(),
        store: state.catalog.store().name().to_string(),
        data_dir: if data_dir_ok { "ok" } else { "error" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn check_data_dir(state: &AppState) -> bool {
    match std::fs::read_dir(state.catalog.data_dir()) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                data_dir = %state.catalog.data_dir().display(),
                error = %e,
                "Data directory is not readable"
            );
            false
        }
    }
}
