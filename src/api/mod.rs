//! rrdgate REST API
//!
//! HTTP API layer for rrdgate, built with Axum.
//!
//! # Endpoints
//!
//! Query and suggest routes are mounted at `/`, `/api` and `/api/v1`.
//!
//! ## Query
//! - `GET /query` - Query string form (`start`, `end`, `step`, repeated `query`/`hidden`)
//! - `POST /query` - JSON body form
//!
//! ## Suggest
//! - `GET /suggest/metrics` - Autocomplete a metric path
//! - `POST /suggest/metrics` - JSON body form
//!
//! ## Health
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check
//! - `GET /health` - Full health status
//!
//! ## Misc
//! - `GET /`, `GET /index.html` - Landing page
//! - `OPTIONS *` - CORS preflight, answered with 200
//!
//! # Example
//!
//! ```rust,ignore
//! use rrdgate::api::{serve, ApiConfig, AppState};
//! use rrdgate::catalog::MetricCatalog;
//! use rrdgate::storage::RrdtoolStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RrdtoolStore::default());
//!     let catalog = MetricCatalog::new("/var/lib/collectd/rrd", ".rrd", store);
//!
//!     serve(AppState::new(catalog, ApiConfig::default())).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::Request,
    http::{header, HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Query and suggest routes, mounted under several prefixes
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/query",
            get(routes::query::query_get).post(routes::query::query_post),
        )
        .route(
            "/suggest/metrics",
            get(routes::suggest::suggest_get).post(routes::suggest::suggest_post),
        )
}

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = state.config.cors;
    let shared_state = Arc::new(state);

    let router = Router::new()
        .route("/", get(routes::index::index))
        .route("/index.html", get(routes::index::index))
        .merge(api_routes())
        .nest("/api", api_routes())
        .nest("/api/v1", api_routes())
        .nest("/health", health_routes)
        .fallback(routes::not_found)
        .layer(middleware::from_fn(answer_options))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&shared_state),
            auth::require_basic_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    if cors {
        router.layer(cors_layer())
    } else {
        router
    }
}

/// CORS policy echoing the caller's origin, credentials allowed
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Answer any `OPTIONS` request that reaches the routes with an empty 200
async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("rrdgate listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("rrdgate shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
