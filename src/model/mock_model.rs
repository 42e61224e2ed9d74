//! # Mock Models for Testing
//!
//! Provides a `MockCompletionModel` and a deterministic `MockEmbeddingModel`
//! implementing the rig traits, so index builds and query synthesis can be
//! exercised in tests without network access.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    embeddings::{Embedding, EmbeddingError, EmbeddingModel},
    one_or_many::OneOrMany,
    streaming::{StreamingChoice, StreamingCompletionModel, StreamingResult},
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A mock completion model that returns a predefined response.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    response: Arc<Mutex<Option<OneOrMany<AssistantContent>>>>,
}

impl MockCompletionModel {
    /// Creates a mock that returns an empty text response until configured.
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn set_response(&self, response: OneOrMany<AssistantContent>) {
        let mut guard = self.response.lock().await;
        *guard = Some(response);
    }

    /// Helper to configure a simple text response.
    pub async fn set_text_response(&self, text: &str) {
        let response = OneOrMany::one(AssistantContent::text(text));
        self.set_response(response).await;
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        let response = {
            let guard = self.response.lock().await;
            guard.clone()
        };
        match response {
            Some(result) => Ok(CompletionResponse {
                choice: result,
                raw_response: "".to_string(),
            }),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: "".to_string(),
            }),
        }
    }
}

impl StreamingCompletionModel for MockCompletionModel {
    /// Streams the configured response as a single message chunk.
    async fn stream(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<StreamingResult, CompletionError> {
        let response = {
            let guard = self.response.lock().await;
            guard.clone()
        };
        let text = response
            .map(|content| {
                content
                    .into_iter()
                    .filter_map(|part| match part {
                        AssistantContent::Text(text) => Some(text.text),
                        _ => None,
                    })
                    .collect::<String>()
            })
            .unwrap_or_default();
        let chunks: Vec<Result<StreamingChoice, CompletionError>> =
            vec![Ok(StreamingChoice::Message(text))];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// A deterministic embedding model for tests.
///
/// The vector for a text depends only on its bytes, so identical texts embed
/// identically across runs and similarity comparisons are stable.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingModel;

impl MockEmbeddingModel {
    pub fn new() -> Self {
        Self
    }

    fn embed_one(text: &str) -> Embedding {
        // Spread byte sums across a few buckets, then normalize.
        let mut vec = vec![0.0f64; 8];
        for (i, b) in text.bytes().enumerate() {
            vec[i % 8] += f64::from(b);
        }
        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }
        Embedding {
            document: text.to_string(),
            vec,
        }
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = 1024;

    fn ndims(&self) -> usize {
        8
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts.into_iter().map(|t| Self::embed_one(&t)).collect())
    }
}
