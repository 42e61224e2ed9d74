//! Error types for the source collector module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for source collection operations
#[derive(Debug, Error)]
pub enum CollectError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git subprocess error
    #[error("Git error: {0}")]
    Git(String),

    /// Notebook conversion error
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CollectError> for CrateError {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::Io(e) => CrateError::Io(e),
            _ => CrateError::Collect(err.to_string()),
        }
    }
}
