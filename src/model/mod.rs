//! # LLM Client Module
//!
//! This module provides a unified client interface for the OpenAI-backed
//! completion and embedding models used by the indexing and query pipeline,
//! with built-in rate limiting to prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `Client`: A unified client that wraps both completion and embedding models
//! - `RateLimitedCompletionModel`: A wrapper that adds rate limiting to any completion model
//! - `RateLimitedEmbeddingModel`: A wrapper that adds rate limiting to any embedding model
//!
//! The completion wrapper also passes streaming requests through, so query
//! engines built on it can stream tokens while staying inside the limiter.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use rig::{completion::CompletionModel, embeddings::EmbeddingModel, providers::openai};

pub mod mock_model;
pub mod ratelimited_completion;
pub mod ratelimited_embedding;

pub use ratelimited_completion::RateLimitedCompletionModel;
pub use ratelimited_embedding::RateLimitedEmbeddingModel;

use crate::error::Error;

/// Embedding model used for indexing and query embedding
pub const EMBEDDING_MODEL: &str = openai::TEXT_EMBEDDING_3_SMALL;

/// A paired completion + embedding client
#[derive(Debug, Clone)]
pub struct Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    completion_model: C,
    embedding_model: E,
}

/// Client type produced by the OpenAI constructors
pub type OpenAiClient = Client<
    RateLimitedCompletionModel<openai::CompletionModel>,
    RateLimitedEmbeddingModel<openai::EmbeddingModel>,
>;

impl OpenAiClient {
    /// Build a rate-limited OpenAI client from `OPENAI_API_KEY`.
    pub fn new_openai_from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable must be set".into()))?;
        Ok(Self::new_openai(openai::Client::new(&api_key), crate::config::DEFAULT_MODEL))
    }

    /// Build a rate-limited client around an existing OpenAI client.
    ///
    /// The completion model name is chosen per-agent by callers; the one given
    /// here only seeds the default model handle.
    pub fn new_openai(openai_client: openai::Client, model: &str) -> Self {
        let completion_limiter = RateLimiter::direct(Quota::per_minute(
            NonZeroU32::new(500).expect("must create rate limit"),
        ));
        let embedding_limiter = RateLimiter::direct(Quota::per_minute(
            NonZeroU32::new(3000).expect("must create rate limit"),
        ));
        let completion_model = RateLimitedCompletionModel::new(
            openai_client.completion_model(model),
            completion_limiter,
        );
        let embedding_model = RateLimitedEmbeddingModel::new(
            openai_client.embedding_model(EMBEDDING_MODEL),
            embedding_limiter,
        );
        Self {
            completion_model,
            embedding_model,
        }
    }
}

impl<C, E> Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    /// Pair an arbitrary completion and embedding model.
    pub fn from_models(completion_model: C, embedding_model: E) -> Self {
        Self {
            completion_model,
            embedding_model,
        }
    }

    pub fn completion(&self) -> &C {
        &self.completion_model
    }

    pub fn embedding(&self) -> &E {
        &self.embedding_model
    }
}
