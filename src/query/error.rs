//! Query error types
//!
//! Defines all error conditions that can occur between receiving a request
//! and handing the assembled series back to the API layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// A time field could not be parsed
    #[error("Invalid time format: '{0}'")]
    InvalidTimeFormat(String),

    /// A duration field could not be parsed
    #[error("Invalid duration format: '{0}'")]
    InvalidDurationFormat(String),

    /// Malformed query token or request
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Token type other than DEF or CDEF
    #[error("Invalid query type: '{0}'")]
    InvalidQueryType(String),

    /// Unknown consolidation function name
    #[error("Invalid consolidation: '{0}'")]
    InvalidConsolidation(String),

    /// Metric path does not name a store file or a datasource of one
    #[error("Metric not found: {0}")]
    MetricNotFound(String),

    /// Datasource missing from, or ambiguous in, a store file
    #[error("Datasource '{datasource}' not found in {file:?}")]
    DatasourceNotFound { datasource: String, file: PathBuf },

    /// Store layer error
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

impl From<crate::storage::InvalidConsolidation> for QueryError {
    fn from(err: crate::storage::InvalidConsolidation) -> Self {
        QueryError::InvalidConsolidation(err.0)
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
