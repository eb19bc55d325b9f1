//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides; the
//! server binary applies its command-line flags last.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Basic auth user; auth is on only when user and password are both set
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Mirror the request origin in CORS headers
    #[serde(default = "default_cors")]
    pub cors: bool,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_cors() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            cors: default_cors(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Basic auth credentials, if enabled
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.user.is_empty() || self.password.is_empty() {
            return None;
        }
        Some((&self.user, &self.password))
    }
}

/// Metric store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// `rrdtool` executable, looked up in `PATH` unless absolute
    #[serde(default = "default_rrdtool")]
    pub rrdtool: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/collectd/rrd")
}

fn default_suffix() -> String {
    crate::catalog::DEFAULT_SUFFIX.to_string()
}

fn default_rrdtool() -> PathBuf {
    PathBuf::from("rrdtool")
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            suffix: default_suffix(),
            rrdtool: default_rrdtool(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("rrdgate").join("config.toml")),
            Some(PathBuf::from("/etc/rrdgate/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = var("RRDGATE_DATA_DIR") {
            self.metrics.data_dir = PathBuf::from(data_dir);
        }

        if let Some(bind) = var("RRDGATE_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = var("RRDGATE_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid RRDGATE_PORT '{}'", port),
            }
        }

        if let Some(level) = var("RRDGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("RRDGATE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check settings that would otherwise fail at the first request
    pub fn validate(&self) -> Result<(), ConfigError> {
        let data_dir = &self.metrics.data_dir;

        if data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("metrics.data_dir is not set".to_string()));
        }

        match std::fs::metadata(data_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(ConfigError::DataDir {
                    path: data_dir.clone(),
                    error: "not a directory".to_string(),
                })
            }
            Err(e) => {
                return Err(ConfigError::DataDir {
                    path: data_dir.clone(),
                    error: e.to_string(),
                })
            }
        }

        if self.metrics.suffix.is_empty() {
            return Err(ConfigError::Invalid("metrics.suffix is empty".to_string()));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Data directory {path:?} is unusable: {error}")]
    DataDir { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# rrdgate Configuration
#
# Environment variables override these settings:
# - RRDGATE_DATA_DIR
# - RRDGATE_BIND
# - RRDGATE_PORT
# - RRDGATE_LOG_LEVEL
# - RRDGATE_LOG_FORMAT
#
# The --bind and --port flags override both.

[server]
# Address to listen on
bind = "0.0.0.0"

# Port to listen on
port = 8085

# HTTP basic auth, enabled when both are set
user = ""
password = ""

# Mirror the request Origin in CORS headers
cors = true

[metrics]
# Root directory of the round-robin files
data_dir = "/var/lib/collectd/rrd"

# Store file extension
suffix = ".rrd"

# rrdtool executable
rrdtool = "rrdtool"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8085");
        assert_eq!(config.metrics.suffix, ".rrd");
        assert!(config.server.credentials().is_none());
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config(), Path::new("default.toml")).unwrap();
        assert_eq!(config.server.port, 8085);
        assert_eq!(config.metrics.data_dir, PathBuf::from("/var/lib/collectd/rrd"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let toml = r#"
[server]
port = 9000
user = "admin"
password = "secret"

[logging]
format = "json"
"#;
        let config = Config::parse(toml, Path::new("partial.toml")).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.credentials(), Some(("admin", "secret")));
        assert!(config.logging.is_json());
        assert_eq!(config.metrics.rrdtool, PathBuf::from("rrdtool"));
    }

    #[test]
    fn test_parse_error() {
        let err = Config::parse("[server]\nport = \"x\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/rrdgate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RRDGATE_DATA_DIR", "/srv/rrd"),
            ("RRDGATE_BIND", "127.0.0.1"),
            ("RRDGATE_PORT", "not-a-port"),
            ("RRDGATE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.metrics.data_dir, PathBuf::from("/srv/rrd"));
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8085);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_validate_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();

        config.metrics.data_dir = dir.path().to_path_buf();
        assert!(config.validate().is_ok());

        config.metrics.data_dir = dir.path().join("missing");
        assert!(matches!(config.validate(), Err(ConfigError::DataDir { .. })));

        let file = dir.path().join("file.rrd");
        std::fs::write(&file, b"").unwrap();
        config.metrics.data_dir = file;
        assert!(matches!(config.validate(), Err(ConfigError::DataDir { .. })));

        config.metrics.data_dir = PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
