//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks; nothing in it
//! changes after startup.

use crate::catalog::MetricCatalog;
use crate::config::ServerConfig;
use crate::query::{QueryExecutor, TimeSpecParser};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Metric namespace and store handle
    pub catalog: Arc<MetricCatalog>,
    /// Query executor for running queries
    pub executor: Arc<QueryExecutor>,
    /// Parser for time fields
    pub times: Arc<TimeSpecParser>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState over a catalog
    pub fn new(catalog: MetricCatalog, config: ApiConfig) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            executor: Arc::new(QueryExecutor::new(Arc::clone(&catalog))),
            catalog,
            times: Arc::new(TimeSpecParser::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind to
    pub bind: String,
    /// Port to listen on
    pub port: u16,
    /// Basic auth user and password
    pub credentials: Option<(String, String)>,
    /// Mirror the request origin in CORS headers
    pub cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for ApiConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            bind: server.bind.clone(),
            port: server.port,
            credentials: server
                .credentials()
                .map(|(user, password)| (user.to_string(), password.to_string())),
            cors: server.cors,
        }
    }
}

impl ApiConfig {
    /// Create config with custom bind address and port
    pub fn new(bind: impl Into<String>, port: u16) -> Self {
        Self {
            bind: bind.into(),
            port,
            ..Default::default()
        }
    }

    /// Builder method: require basic auth
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
