//! Round-robin store access
//!
//! rrdgate never reads the on-disk round-robin format itself. Everything it
//! needs from the store goes through the [`Store`] trait:
//!
//! - **types**: Contract types (Consolidation, ExportRequest, ExportResult)
//! - **rrdtool**: Store backed by the `rrdtool` binary (`info` and `xport`)
//! - **memory**: In-process store for tests and demos
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Suggest / Resolve:
//!   MetricCatalog → Store::info(file) → datasource names
//!
//! Query:
//!   QueryExecutor → Store::export(defs, outputs, start, end, step) → column/row matrix
//! ```

pub mod error;
pub mod memory;
pub mod rrdtool;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryFile, MemoryStore};
pub use rrdtool::RrdtoolStore;
pub use types::{Consolidation, ExportDef, ExportRequest, ExportResult, InvalidConsolidation};

use async_trait::async_trait;
use std::path::Path;

/// Capabilities rrdgate consumes from the round-robin store
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name, used in logs and health output
    fn name(&self) -> &str;

    /// Datasource names of a store file, in the file's declaration order
    async fn info(&self, file: &Path) -> StorageResult<Vec<String>>;

    /// Evaluate an export request
    ///
    /// Bindings are evaluated in order; only the bindings named in
    /// `request.outputs` become result columns.
    async fn export(&self, request: &ExportRequest) -> StorageResult<ExportResult>;
}
