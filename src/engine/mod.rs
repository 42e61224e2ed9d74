//! # Query Engine Module
//!
//! Wraps the vector store in a retrieval-augmented query pipeline: embed the
//! query, retrieve the top-k most similar nodes, drop everything below the
//! similarity cutoff, and synthesize an answer by tree summarization with a
//! streamed final response.
//!
//! Engines are cheap, session-scoped values: one per chat session, all
//! sharing the same read-only store.

mod error;
mod synthesizer;

pub use error::EngineError;
pub use synthesizer::{answer_prompt, pack_texts, tree_reduce};

use crate::model::{Client, OpenAiClient};
use crate::store::{ScoredNode, VectorStore};
use crate::AppConfig;
use rig::agent::AgentBuilder;
use rig::completion::{CompletionModel, Prompt};
use rig::embeddings::EmbeddingModel;
use rig::providers::openai;
use rig::streaming::{StreamingChoice, StreamingCompletionModel, StreamingPrompt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, instrument, warn};

/// Default similarity cutoff below which retrieved nodes are discarded
pub const DEFAULT_SIMILARITY_CUTOFF: f64 = 0.7;

/// Default number of nodes retrieved per query
pub const DEFAULT_TOP_K: usize = 10;

/// How retrieved context is turned into an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Recursively summarize context batches before answering
    TreeSummarize,

    /// Stuff all retrieved context into a single prompt
    Compact,
}

/// Configuration for a query engine
#[derive(Debug, Clone)]
pub struct QueryEngineConfig {
    /// Completion model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Minimum similarity score a retrieved node must reach
    pub similarity_cutoff: f64,

    /// Number of nodes retrieved per query
    pub top_k: usize,

    /// Response synthesis mode
    pub response_mode: ResponseMode,
}

impl Default for QueryEngineConfig {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL.to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
            similarity_cutoff: DEFAULT_SIMILARITY_CUTOFF,
            top_k: DEFAULT_TOP_K,
            response_mode: ResponseMode::TreeSummarize,
        }
    }
}

/// Builder for QueryEngineConfig
#[derive(Debug, Default)]
pub struct QueryEngineConfigBuilder {
    config: QueryEngineConfig,
}

impl QueryEngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: QueryEngineConfig::default(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn similarity_cutoff(mut self, similarity_cutoff: f64) -> Self {
        self.config.similarity_cutoff = similarity_cutoff;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn response_mode(mut self, response_mode: ResponseMode) -> Self {
        self.config.response_mode = response_mode;
        self
    }

    pub fn build(self) -> QueryEngineConfig {
        self.config
    }
}

impl QueryEngineConfig {
    pub fn builder() -> QueryEngineConfigBuilder {
        QueryEngineConfigBuilder::new()
    }
}

/// A query response: streamed tokens when the provider streams, or a single
/// final text otherwise
pub enum QueryResponse {
    /// Incremental token sequence
    Streaming(UnboundedReceiverStream<String>),

    /// Single final text
    Complete(String),
}

impl QueryResponse {
    /// Collect the whole response into one string, draining a stream if any.
    pub async fn into_text(self) -> String {
        use futures::StreamExt;
        match self {
            QueryResponse::Streaming(mut stream) => {
                let mut text = String::new();
                while let Some(token) = stream.next().await {
                    text.push_str(&token);
                }
                text
            }
            QueryResponse::Complete(text) => text,
        }
    }
}

/// Drop retrieved nodes scoring below the cutoff.
pub fn filter_by_cutoff(results: Vec<ScoredNode>, cutoff: f64) -> Vec<ScoredNode> {
    results.into_iter().filter(|s| s.score >= cutoff).collect()
}

/// A retrieval-augmented query engine over a shared vector store
pub struct QueryEngine<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    store: Arc<VectorStore>,
    client: Client<C, E>,
    config: QueryEngineConfig,
}

/// Build a query engine with a fresh OpenAI client bound to the configured
/// model and temperature.
pub fn make_query_engine(
    store: Arc<VectorStore>,
    app: &AppConfig,
) -> QueryEngine<
    crate::model::RateLimitedCompletionModel<openai::CompletionModel>,
    crate::model::RateLimitedEmbeddingModel<openai::EmbeddingModel>,
> {
    let client: OpenAiClient =
        Client::new_openai(openai::Client::new(&app.openai_api_key), &app.model);
    let config = QueryEngineConfig::builder()
        .model(&app.model)
        .temperature(app.temperature)
        .build();
    QueryEngine::new(store, client, config)
}

impl<C, E> QueryEngine<C, E>
where
    C: CompletionModel + StreamingCompletionModel + Clone + Send + Sync + 'static,
    E: EmbeddingModel,
{
    pub fn new(store: Arc<VectorStore>, client: Client<C, E>, config: QueryEngineConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    pub fn config(&self) -> &QueryEngineConfig {
        &self.config
    }

    /// Run one retrieval-augmented query.
    #[instrument(skip(self, text))]
    pub async fn query(&self, text: &str) -> Result<QueryResponse, EngineError> {
        let query_embedding = self
            .client
            .embedding()
            .embed_texts(vec![text.to_string()])
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?
            .pop()
            .ok_or_else(|| EngineError::Embedding("no embedding returned for query".into()))?;

        let retrieved = self.store.top_k(&query_embedding.vec, self.config.top_k);
        let kept = filter_by_cutoff(retrieved, self.config.similarity_cutoff);
        info!(
            "Retrieved {} nodes above cutoff {}",
            kept.len(),
            self.config.similarity_cutoff
        );

        let texts: Vec<String> = kept.into_iter().map(|s| s.node.text).collect();

        let agent = AgentBuilder::new(self.client.completion().clone())
            .preamble(
                "You are a documentation assistant for quantitative trading tooling. \
                 Answer strictly from the provided context.",
            )
            .temperature(self.config.temperature)
            .build();

        let context = match self.config.response_mode {
            ResponseMode::TreeSummarize => tree_reduce(&agent, texts, text).await?,
            ResponseMode::Compact => pack_texts(&texts, usize::MAX)
                .pop()
                .unwrap_or_default(),
        };

        let prompt = answer_prompt(&context, text);

        match agent.stream_prompt(&prompt).await {
            Ok(mut stream) => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(async move {
                    use futures::StreamExt;
                    while let Some(chunk) = stream.next().await {
                        match chunk {
                            Ok(StreamingChoice::Message(token)) => {
                                if tx.send(token).is_err() {
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("response stream ended with error: {}", e);
                                break;
                            }
                        }
                    }
                });
                Ok(QueryResponse::Streaming(UnboundedReceiverStream::new(rx)))
            }
            Err(e) => {
                debug!("streaming unavailable ({}), using a single response", e);
                let answer = agent.prompt(prompt.as_str()).await?;
                Ok(QueryResponse::Complete(answer))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::IndexNode;

    fn scored(score: f64) -> ScoredNode {
        ScoredNode {
            node: IndexNode {
                source: "docs/a.md".to_string(),
                position: 0,
                heading: None,
                text: format!("node at {}", score),
                embedding: vec![1.0],
            },
            score,
        }
    }

    #[test]
    fn test_filter_excludes_below_cutoff() {
        let results = vec![scored(0.69), scored(0.7), scored(0.95)];
        let kept = filter_by_cutoff(results, 0.7);
        let scores: Vec<f64> = kept.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![0.7, 0.95]);
    }

    #[test]
    fn test_filter_keeps_all_when_cutoff_low() {
        let results = vec![scored(0.1), scored(0.2)];
        assert_eq!(filter_by_cutoff(results, 0.0).len(), 2);
    }

    #[test]
    fn test_config_defaults_match_pipeline() {
        let config = QueryEngineConfig::default();
        assert_eq!(config.similarity_cutoff, 0.7);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.response_mode, ResponseMode::TreeSummarize);
    }

    #[test]
    fn test_config_builder() {
        let config = QueryEngineConfig::builder()
            .model("gpt-4")
            .temperature(0.3)
            .similarity_cutoff(0.5)
            .top_k(3)
            .response_mode(ResponseMode::Compact)
            .build();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.similarity_cutoff, 0.5);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.response_mode, ResponseMode::Compact);
    }

    #[tokio::test]
    async fn test_query_response_complete_into_text() {
        let response = QueryResponse::Complete("done".to_string());
        assert_eq!(response.into_text().await, "done");
    }

    #[tokio::test]
    async fn test_query_response_streaming_into_text() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("a ".to_string()).unwrap();
        tx.send("b".to_string()).unwrap();
        drop(tx);
        let response = QueryResponse::Streaming(UnboundedReceiverStream::new(rx));
        assert_eq!(response.into_text().await, "a b");
    }
}
