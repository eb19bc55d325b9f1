//! Query Executor
//!
//! Runs a query against the store:
//! 1. Validation of the window, step and definitions
//! 2. Compilation of definitions to store bindings
//! 3. One export call for all bindings
//! 4. Assembly of the visible columns into series
//!
//! # Execution Pipeline
//!
//! ```text
//! QuerySpec → validate → compile (resolve + datasources) → Store::export → assemble → QueryOutput
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::MetricCatalog;
use crate::query::ast::QuerySpec;
use crate::query::compiler::compile;
use crate::query::error::QueryResult;
use crate::query::series::{assemble, Series};
use crate::storage::Store;

/// Result of a query execution
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    /// Requested window start, unix seconds
    pub start: i64,
    /// Requested window end, unix seconds
    pub end: i64,
    /// Step the store used, seconds
    pub step: i64,
    /// One series per visible definition
    pub series: Vec<Series>,
}

/// Query executor
pub struct QueryExecutor {
    catalog: Arc<MetricCatalog>,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(catalog: Arc<MetricCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    fn store(&self) -> &Arc<dyn Store> {
        self.catalog.store()
    }

    /// Execute a query
    pub async fn execute(&self, spec: &QuerySpec) -> QueryResult<QueryOutput> {
        let started = Instant::now();

        spec.validate()?;
        let request = compile(&self.catalog, spec).await?;
        let result = self.store().export(&request).await?;
        let series = assemble(&result, request.end);

        tracing::debug!(
            store = self.store().name(),
            definitions = request.defs.len(),
            outputs = series.len(),
            rows = result.rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query executed"
        );

        Ok(QueryOutput {
            start: request.start,
            end: request.end,
            step: result.step,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_SUFFIX;
    use crate::query::ast::QueryDef;
    use crate::query::error::QueryError;
    use crate::query::parser::parse_def;
    use crate::storage::{MemoryFile, MemoryStore};
    use chrono::{Duration, Local, TimeZone};
    use tempfile::TempDir;

    const T: i64 = 946771200;

    /// `iface/eth0/octets.rrd` with rx sampled every minute from T+60
    fn create_test_executor() -> (QueryExecutor, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("iface/eth0/octets.rrd");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, b"").unwrap();

        let mut octets = MemoryFile::new(&["rx", "tx"]);
        for (i, rx) in [100.0, 110.0, 120.0, 130.0, 140.0, 150.0].iter().enumerate() {
            let t = T + 60 * (i as i64 + 1);
            octets = octets.sample(t, &[*rx, 2.0 * rx]);
        }

        let store = MemoryStore::new().with_file(file, octets);
        let catalog = MetricCatalog::new(temp_dir.path(), DEFAULT_SUFFIX, Arc::new(store));
        (QueryExecutor::new(Arc::new(catalog)), temp_dir)
    }

    fn window() -> QuerySpec {
        let start = Local.timestamp_opt(T, 0).unwrap();
        QuerySpec::new(start, start + Duration::seconds(300)).with_step(Duration::seconds(60))
    }

    #[tokio::test]
    async fn test_execute_def_grid() {
        let (executor, _dir) = create_test_executor();
        let spec = window().with_def(parse_def("DEF:A=iface/eth0/octets:rx:AVERAGE").unwrap());

        let output = executor.execute(&spec).await.unwrap();

        assert_eq!(output.start, T);
        assert_eq!(output.end, T + 300);
        assert_eq!(output.step, 60);
        assert_eq!(output.series.len(), 1);

        let a = &output.series[0];
        assert_eq!(a.name, "A");
        assert_eq!(
            a.dps.iter().collect::<Vec<_>>(),
            vec![
                (T + 60, 100.0),
                (T + 120, 110.0),
                (T + 180, 120.0),
                (T + 240, 130.0),
                (T + 300, 140.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_hidden_columns() {
        let (executor, _dir) = create_test_executor();
        let spec = window()
            .with_hidden(parse_def("DEF:RX=iface/eth0/octets:rx:AVERAGE").unwrap())
            .with_def(parse_def("DEF:TX=iface/eth0/octets/tx::AVERAGE").unwrap())
            .with_def(parse_def("CDEF:SUM=RX,TX,+").unwrap());

        let output = executor.execute(&spec).await.unwrap();

        let names: Vec<&str> = output.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["TX", "SUM"]);
        assert_eq!(output.series[0].dps.get(T + 60), Some(200.0));
        assert_eq!(output.series[1].dps.get(T + 60), Some(300.0));
    }

    #[tokio::test]
    async fn test_execute_missing_samples_are_nan() {
        let (executor, _dir) = create_test_executor();
        let start = Local.timestamp_opt(T + 300, 0).unwrap();
        let spec = QuerySpec::new(start, start + Duration::seconds(180))
            .with_step(Duration::seconds(60))
            .with_def(parse_def("DEF:A=iface/eth0/octets:rx:").unwrap());

        let output = executor.execute(&spec).await.unwrap();
        let a = &output.series[0];

        assert_eq!(a.dps.timestamps(), vec![T + 360, T + 420, T + 480]);
        assert_eq!(a.dps.get(T + 360), Some(150.0));
        assert!(a.dps.get(T + 420).unwrap().is_nan());
        assert!(a.dps.get(T + 480).unwrap().is_nan());
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_spec() {
        let (executor, _dir) = create_test_executor();

        let spec = window().with_hidden(QueryDef::cdef("X", "1"));
        assert!(matches!(
            executor.execute(&spec).await,
            Err(QueryError::InvalidQuery(_))
        ));

        let spec = window().with_def(parse_def("DEF:A=iface/eth9/octets:rx:AVERAGE").unwrap());
        assert!(matches!(
            executor.execute(&spec).await,
            Err(QueryError::MetricNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_store_error() {
        let (executor, _dir) = create_test_executor();
        let spec = window().with_def(QueryDef::cdef("BAD", "NOPE,1,+"));

        let err = executor.execute(&spec).await.unwrap_err();
        assert!(matches!(err, QueryError::Storage(_)));
    }
}
