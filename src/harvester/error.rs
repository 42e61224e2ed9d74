//! Error types for the harvester module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for harvesting operations
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Crawl subscription error
    #[error("Subscribe error: {0}")]
    Subscribe(String),

    /// Background task error
    #[error("Task error: {0}")]
    Task(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<HarvestError> for CrateError {
    fn from(err: HarvestError) -> Self {
        match err {
            HarvestError::Io(e) => CrateError::Io(e),
            _ => CrateError::Harvest(err.to_string()),
        }
    }
}
