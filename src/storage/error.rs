//! Store error types
//!
//! Defines all errors that can occur while talking to the round-robin store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the store layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed (spawning the store process, reading files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The store command exited with a failure status
    #[error("Store command failed: {0}")]
    Command(String),

    /// The store produced output we could not understand
    #[error("Malformed store output: {0}")]
    Malformed(String),

    /// The requested file is not known to the store
    #[error("Store file not found: {0:?}")]
    FileNotFound(PathBuf),

    /// The export request cannot be evaluated by the store
    #[error("Invalid export: {0}")]
    InvalidExport(String),
}

impl From<quick_xml::DeError> for StorageError {
    fn from(err: quick_xml::DeError) -> Self {
        StorageError::Malformed(err.to_string())
    }
}

/// Result type alias for store operations
pub type StorageResult<T> = Result<T, StorageError>;
