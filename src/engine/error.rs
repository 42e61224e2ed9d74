//! Error types for the query engine module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for query engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Completion model error
    #[error("Completion error: {0}")]
    Completion(#[from] rig::completion::CompletionError),

    /// Prompting error
    #[error("Prompt error: {0}")]
    Prompt(#[from] rig::completion::PromptError),

    /// Query embedding error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<EngineError> for CrateError {
    fn from(err: EngineError) -> Self {
        CrateError::Engine(err.to_string())
    }
}
