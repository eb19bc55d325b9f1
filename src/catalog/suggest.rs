//! Metric autocomplete
//!
//! A query is `<path>[:<ds prefix>]`. Non-recursive suggestions complete one
//! path segment at a time; recursive suggestions list fully qualified
//! metric names.
//!
//! ```text
//! query                                   recursive=false
//! ""                                      server1.net
//! "server1.net/"                          cpu-0 cpu-1 interface-eth0
//! "server1.net/interface-eth0/if_octets"  rx tx
//! "server1.net/interface-eth0/if_octets:r" rx
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::path::{dir_part, split_last, split_query};
use super::MetricCatalog;
use crate::query::QueryResult;

/// One suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestEntry {
    /// Completed path segment, datasource name or full metric path
    pub metric: String,
    /// Datasources of the suggested file, empty for directories
    #[serde(default)]
    pub ds: Vec<String>,
}

impl SuggestEntry {
    fn new(metric: impl Into<String>, ds: Vec<String>) -> Self {
        Self {
            metric: metric.into(),
            ds,
        }
    }
}

/// Where a suggest query points
enum Target {
    /// A single store file, with the datasource prefix to filter by
    File { metric: String, ds_prefix: String },
    /// Store files found by walking, already filtered by path prefix
    Files(Vec<String>),
}

impl MetricCatalog {
    /// Autocomplete a metric path
    pub async fn suggest(
        &self,
        query: &str,
        recursive: bool,
        with_ds: bool,
    ) -> QueryResult<Vec<SuggestEntry>> {
        let (path, ds_filter) = split_query(query);
        let target = self.locate(&path, ds_filter.as_deref());

        let mut entries = if recursive {
            self.suggest_recursive(target, ds_filter.as_deref()).await?
        } else {
            self.suggest_next_segment(&path, target, ds_filter.as_deref(), with_ds)
                .await?
        };

        if !with_ds {
            for entry in &mut entries {
                entry.ds.clear();
            }
        }

        tracing::debug!(query, recursive, count = entries.len(), "Suggest");
        Ok(entries)
    }

    fn locate(&self, path: &str, ds_filter: Option<&str>) -> Target {
        let base = path.trim_end_matches('/');
        let trailing_slash = path.ends_with('/');

        if self.is_file(base) {
            return Target::File {
                metric: base.to_string(),
                ds_prefix: ds_filter.unwrap_or_default().to_string(),
            };
        }

        // "file/partial-ds"
        if !trailing_slash && ds_filter.is_none() {
            if let Some((parent, last)) = split_last(base) {
                if self.is_file(parent) {
                    return Target::File {
                        metric: parent.to_string(),
                        ds_prefix: last.to_string(),
                    };
                }
            }
        }

        let start = if base.is_empty() || self.is_dir(base) {
            base
        } else {
            dir_part(base).trim_end_matches('/')
        };

        let files = self
            .walk(start)
            .into_iter()
            .filter(|metric| metric.starts_with(path))
            .collect();
        Target::Files(files)
    }

    async fn suggest_next_segment(
        &self,
        path: &str,
        target: Target,
        ds_filter: Option<&str>,
        with_ds: bool,
    ) -> QueryResult<Vec<SuggestEntry>> {
        let files = match target {
            Target::File { metric, ds_prefix } => {
                let datasources = self.datasources(&self.file_for(&metric)).await?;
                let mut names: Vec<String> = datasources
                    .into_iter()
                    .filter(|ds| ds.starts_with(&ds_prefix))
                    .collect();
                names.sort();
                names.dedup();
                return Ok(names
                    .into_iter()
                    .map(|ds| SuggestEntry::new(ds, Vec::new()))
                    .collect());
            }
            Target::Files(files) => files,
        };

        let dir = dir_part(path);
        let mut segments: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for metric in files {
            let Some(rest) = metric.strip_prefix(dir) else {
                continue;
            };
            match rest.split_once('/') {
                Some((segment, _)) => {
                    segments.entry(segment.to_string()).or_default();
                }
                None => {
                    let ds = if with_ds {
                        filter_prefix(
                            self.datasources(&self.file_for(&metric)).await?,
                            ds_filter,
                        )
                    } else {
                        Vec::new()
                    };
                    segments.insert(rest.to_string(), ds);
                }
            }
        }

        Ok(segments
            .into_iter()
            .map(|(metric, ds)| SuggestEntry::new(metric, ds))
            .collect())
    }

    async fn suggest_recursive(
        &self,
        target: Target,
        ds_filter: Option<&str>,
    ) -> QueryResult<Vec<SuggestEntry>> {
        let (files, ds_prefix) = match target {
            Target::File { metric, ds_prefix } => (vec![metric], Some(ds_prefix)),
            Target::Files(files) => (files, ds_filter.map(str::to_string)),
        };

        let mut entries = Vec::new();
        for metric in files {
            let datasources = self.datasources(&self.file_for(&metric)).await?;

            if let [only] = datasources.as_slice() {
                if matches_prefix(only, ds_prefix.as_deref()) {
                    entries.push(SuggestEntry::new(metric, vec![only.clone()]));
                }
                continue;
            }

            for ds in datasources {
                if matches_prefix(&ds, ds_prefix.as_deref()) {
                    entries.push(SuggestEntry::new(format!("{}/{}", metric, ds), vec![ds]));
                }
            }
        }

        entries.sort_by(|a, b| a.metric.cmp(&b.metric));
        entries.dedup_by(|a, b| a.metric == b.metric);
        Ok(entries)
    }
}

fn matches_prefix(ds: &str, prefix: Option<&str>) -> bool {
    prefix.map_or(true, |p| ds.starts_with(p))
}

fn filter_prefix(datasources: Vec<String>, prefix: Option<&str>) -> Vec<String> {
    datasources
        .into_iter()
        .filter(|ds| matches_prefix(ds, prefix))
        .collect()
}
