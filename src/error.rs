//! Error types for the quantgpt crate

use thiserror::Error;

/// Result type for quantgpt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for quantgpt operations
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source collection error
    #[error("Collect error: {0}")]
    Collect(String),

    /// Web harvesting error
    #[error("Harvest error: {0}")]
    Harvest(String),

    /// Vector store error
    #[error("Store error: {0}")]
    Store(String),

    /// Query engine error
    #[error("Engine error: {0}")]
    Engine(String),

    /// Chat session error
    #[error("Chat error: {0}")]
    Chat(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
