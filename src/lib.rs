//! # rrdgate
//!
//! HTTP query gateway for round-robin time-series files, such as the trees
//! collectd writes. Clients send `DEF`/`CDEF` queries over a time window and
//! get JSON series back; an autocomplete endpoint walks the metric tree.
//!
//! ## Features
//!
//! - **Flexible time input**: `now`, epoch seconds or milliseconds, dates,
//!   times of day and signed offsets like `-1h30m`
//! - **Query language**: `DEF` bindings to store files, `CDEF` expressions
//!   over earlier bindings, hidden helper series
//! - **Metric autocomplete**: next-segment and recursive suggestions with
//!   datasource names
//! - **Pluggable store**: the `rrdtool` binary in production, an in-memory
//!   store for tests
//!
//! ## Modules
//!
//! - [`storage`]: Store trait and backends
//! - [`catalog`]: Metric namespace, resolution and suggest
//! - [`query`]: Time parsing, query language and execution
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rrdgate::catalog::MetricCatalog;
//! use rrdgate::query::{parse_def, parse_duration, QueryExecutor, QuerySpec, TimeSpecParser};
//! use rrdgate::storage::RrdtoolStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RrdtoolStore::default());
//!     let catalog = Arc::new(MetricCatalog::new("/var/lib/collectd/rrd", ".rrd", store));
//!     let executor = QueryExecutor::new(catalog);
//!
//!     let times = TimeSpecParser::new();
//!     let spec = QuerySpec::new(times.parse_instant("-1h")?, times.parse_instant("now")?)
//!         .with_step(parse_duration("1m")?)
//!         .with_def(parse_def("DEF:load=server1/load/load:shortterm:AVERAGE")?);
//!
//!     let output = executor.execute(&spec).await?;
//!     for series in &output.series {
//!         println!("{}: {} points", series.name, series.dps.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Consolidation, ExportDef, ExportRequest, ExportResult, MemoryStore, RrdtoolStore, Store,
    StorageError, StorageResult,
};

pub use catalog::{MetricCatalog, ResolvedMetric, SuggestEntry};

pub use query::{
    parse_def, parse_duration, QueryError, QueryExecutor, QueryOutput, QuerySpec, Series,
    TimeSpecParser,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig, MetricsConfig, ServerConfig};
