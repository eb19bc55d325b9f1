//! rrdgate server
//!
//! Run with: cargo run --bin rrdgate -- --config /etc/rrdgate/config.toml
//!
//! # Configuration
//!
//! Settings come from the TOML file given with `--config`, else the first of
//! `$XDG_CONFIG_HOME/rrdgate/config.toml`, `/etc/rrdgate/config.toml` and
//! `./config.toml`. Environment variables override the file:
//! - `RRDGATE_DATA_DIR`: Metric tree root (default: /var/lib/collectd/rrd)
//! - `RRDGATE_BIND`: Address to bind to (default: 0.0.0.0)
//! - `RRDGATE_PORT`: Port to listen on (default: 8085)
//! - `RRDGATE_LOG_LEVEL`: Log level (default: info)
//! - `RRDGATE_LOG_FORMAT`: `pretty` or `json`
//! - `RUST_LOG`: Full filter directive, wins over the log level
//!
//! `--bind` and `--port` override everything else.

use clap::Parser;
use rrdgate::api::{serve, ApiConfig, AppState};
use rrdgate::catalog::MetricCatalog;
use rrdgate::config::{Config, LoggingConfig};
use rrdgate::storage::RrdtoolStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rrdgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP query gateway for round-robin metric files")]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting rrdgate v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    tracing::info!("Data directory: {:?}", config.metrics.data_dir);
    tracing::info!("rrdtool binary: {:?}", config.metrics.rrdtool);

    let store = Arc::new(RrdtoolStore::new(&config.metrics.rrdtool));
    let catalog = MetricCatalog::new(
        &config.metrics.data_dir,
        config.metrics.suffix.as_str(),
        store,
    );

    let api_config = ApiConfig::from(&config.server);
    if api_config.credentials.is_some() {
        tracing::info!("Basic authentication enabled");
    }

    serve(AppState::new(catalog, api_config)).await?;

    tracing::info!("rrdgate stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "rrdgate={level},tower_http={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
