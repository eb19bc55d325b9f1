//! Metric namespace
//!
//! Maps metric paths onto store files below the data directory:
//!
//! - **path**: Normalization and suggest query splitting
//! - **suggest**: Hierarchical autocomplete
//!
//! # Layout
//!
//! ```text
//! <data_dir>/server1.net/interface-eth0/if_octets.rrd   (datasources rx, tx)
//!
//! server1.net/interface-eth0/if_octets      → file, datasource from the query
//! server1.net/interface-eth0/if_octets/rx   → file, datasource "rx"
//! ```
//!
//! Nothing is cached: every call looks at the filesystem again.

mod path;
mod suggest;

pub use path::{normalize_metric, split_query, DS_SEPARATOR};
pub use suggest::SuggestEntry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::query::{QueryError, QueryResult};
use crate::storage::Store;

/// Default store file extension
pub const DEFAULT_SUFFIX: &str = ".rrd";

/// A metric path mapped to its store file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetric {
    /// Normalized metric path as requested
    pub metric: String,
    /// Store file holding the series
    pub file: PathBuf,
    /// Datasource named by the last path segment, if the path went past the file
    pub datasource: Option<String>,
}

/// Metric namespace rooted at a data directory
#[derive(Clone)]
pub struct MetricCatalog {
    data_dir: PathBuf,
    suffix: String,
    store: Arc<dyn Store>,
}

impl MetricCatalog {
    /// Create a catalog over `data_dir`, reading datasource names from `store`
    pub fn new(data_dir: impl Into<PathBuf>, suffix: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self {
            data_dir: data_dir.into(),
            suffix: suffix.into(),
            store,
        }
    }

    /// Root directory of the namespace
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Store file extension
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Store handle
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Store file a normalized metric path would live in
    pub fn file_for(&self, metric: &str) -> PathBuf {
        self.data_dir.join(format!("{}{}", metric, self.suffix))
    }

    fn is_file(&self, metric: &str) -> bool {
        !metric.is_empty()
            && std::fs::metadata(self.file_for(metric))
                .map(|m| m.is_file())
                .unwrap_or(false)
    }

    fn is_dir(&self, metric: &str) -> bool {
        std::fs::metadata(self.data_dir.join(metric))
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Map a metric path to a store file and optional datasource
    ///
    /// `a/b/c` resolves to file `a/b/c` when it exists, else to file `a/b`
    /// with datasource `c`.
    pub fn resolve(&self, raw: &str) -> QueryResult<ResolvedMetric> {
        let normalized = normalize_metric(raw);
        let metric = normalized.trim_end_matches('/');

        if self.is_file(metric) {
            return Ok(ResolvedMetric {
                metric: metric.to_string(),
                file: self.file_for(metric),
                datasource: None,
            });
        }

        if let Some((parent, datasource)) = path::split_last(metric) {
            if self.is_file(parent) {
                return Ok(ResolvedMetric {
                    metric: metric.to_string(),
                    file: self.file_for(parent),
                    datasource: Some(datasource.to_string()),
                });
            }
        }

        Err(QueryError::MetricNotFound(raw.to_string()))
    }

    /// Datasource names of a store file
    pub async fn datasources(&self, file: &Path) -> QueryResult<Vec<String>> {
        Ok(self.store.info(file).await?)
    }

    /// Metric paths of every store file below `start` (a normalized directory
    /// path, empty for the root), unsorted
    fn walk(&self, start: &str) -> Vec<String> {
        let mut metrics = Vec::new();
        self.walk_dir(&self.data_dir.join(start), &mut metrics);
        metrics
    }

    fn walk_dir(&self, dir: &Path, metrics: &mut Vec<String>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = ?dir, error = %e, "Skipping unreadable directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();

            // Symlinked directories are not followed
            if file_type.is_dir() {
                self.walk_dir(&path, metrics);
            } else if let Some(metric) = self.metric_name(&path) {
                metrics.push(metric);
            }
        }
    }

    /// Metric path of a store file, `None` for anything without the suffix
    fn metric_name(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.data_dir).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let joined = segments.join("/");
        let metric = joined.strip_suffix(self.suffix.as_str())?;

        if metric.is_empty() || metric.ends_with('/') {
            return None;
        }
        Some(metric.to_string())
    }
}

impl std::fmt::Debug for MetricCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricCatalog")
            .field("data_dir", &self.data_dir)
            .field("suffix", &self.suffix)
            .field("store", &self.store.name())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{MemoryFile, MemoryStore};
    use tempfile::TempDir;

    /// Files of the test namespace and their datasources
    pub(crate) const TREE: &[(&str, &[&str])] = &[
        ("server1.net/interface-eth0/if_errors", &["rx", "tx"]),
        ("server1.net/interface-eth0/if_octets", &["rx", "tx"]),
        ("server1.net/interface-eth0/if_packets", &["rx", "tx"]),
        ("server1.net/cpu-0/cpu-system", &["value"]),
        ("server1.net/cpu-1/cpu-system", &["value"]),
    ];

    /// Create the test tree on disk with a matching in-memory store
    pub(crate) fn create_test_catalog() -> (MetricCatalog, TempDir) {
        create_catalog_with(TREE)
    }

    pub(crate) fn create_catalog_with(tree: &[(&str, &[&str])]) -> (MetricCatalog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MemoryStore::new();

        for (metric, datasources) in tree {
            let file = temp_dir.path().join(format!("{}.rrd", metric));
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, b"").unwrap();
            store.insert(file, MemoryFile::new(datasources));
        }

        let catalog = MetricCatalog::new(temp_dir.path(), DEFAULT_SUFFIX, Arc::new(store));
        (catalog, temp_dir)
    }

    #[test]
    fn test_resolve_file() {
        let (catalog, dir) = create_test_catalog();

        let resolved = catalog.resolve("server1.net/interface-eth0/if_octets").unwrap();
        assert_eq!(resolved.metric, "server1.net/interface-eth0/if_octets");
        assert_eq!(
            resolved.file,
            dir.path().join("server1.net/interface-eth0/if_octets.rrd")
        );
        assert_eq!(resolved.datasource, None);
    }

    #[test]
    fn test_resolve_datasource_fallback() {
        let (catalog, dir) = create_test_catalog();

        let resolved = catalog.resolve("server1.net/interface-eth0/if_octets/rx").unwrap();
        assert_eq!(
            resolved.file,
            dir.path().join("server1.net/interface-eth0/if_octets.rrd")
        );
        assert_eq!(resolved.datasource.as_deref(), Some("rx"));
    }

    #[test]
    fn test_resolve_normalizes() {
        let (catalog, _dir) = create_test_catalog();

        let resolved = catalog.resolve("/server1.net//cpu-0/./cpu-system/").unwrap();
        assert_eq!(resolved.metric, "server1.net/cpu-0/cpu-system");
        assert_eq!(resolved.datasource, None);

        let resolved = catalog.resolve("../server1.net/cpu-1/../cpu-0/cpu-system").unwrap();
        assert_eq!(resolved.metric, "server1.net/cpu-0/cpu-system");
    }

    #[test]
    fn test_resolve_not_found() {
        let (catalog, _dir) = create_test_catalog();

        for metric in ["", "/", "server1.net", "server1.net/cpu-0", "nope/a/b"] {
            assert!(
                matches!(catalog.resolve(metric), Err(QueryError::MetricNotFound(_))),
                "{}",
                metric
            );
        }
    }

    #[tokio::test]
    async fn test_datasources() {
        let (catalog, _dir) = create_test_catalog();

        let file = catalog.file_for("server1.net/interface-eth0/if_errors");
        assert_eq!(catalog.datasources(&file).await.unwrap(), vec!["rx", "tx"]);

        let missing = catalog.file_for("nope");
        assert!(matches!(
            catalog.datasources(&missing).await,
            Err(QueryError::Storage(_))
        ));
    }

    #[test]
    fn test_walk() {
        let (catalog, dir) = create_test_catalog();
        std::fs::write(dir.path().join("server1.net/notes.txt"), b"").unwrap();

        let mut all = catalog.walk("");
        all.sort();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], "server1.net/cpu-0/cpu-system");

        let mut cpu = catalog.walk("server1.net/cpu-1");
        cpu.sort();
        assert_eq!(cpu, vec!["server1.net/cpu-1/cpu-system"]);

        assert!(catalog.walk("missing").is_empty());
    }
}
