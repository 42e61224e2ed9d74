//! Error types for the vector store module

use crate::error::Error as CrateError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for vector store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A persisted index exists but cannot be read.
    ///
    /// Distinct from "no index yet": an unreadable index is never silently
    /// rebuilt. Delete the directory to rebuild from sources.
    #[error("Corrupt index at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for CrateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => CrateError::Io(e),
            StoreError::Json(e) => CrateError::Json(e),
            _ => CrateError::Store(err.to_string()),
        }
    }
}
