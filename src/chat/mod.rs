//! # Chat Front End Module
//!
//! A session-scoped chat loop over the query engine. Each session
//! authenticates against the development credential, owns one query engine
//! bound to the shared store, and streams answer tokens to the terminal as
//! they arrive, falling back to a single final message when the provider does
//! not stream.

mod auth;

pub use auth::{authenticate, Identity, Role};

use crate::engine::{QueryEngine, QueryResponse};
use crate::error::{Error, Result};
use futures::StreamExt;
use rig::completion::CompletionModel;
use rig::embeddings::EmbeddingModel;
use rig::streaming::StreamingCompletionModel;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, instrument};

/// One chat session: an authenticated user and their private query engine
///
/// The engine lives exactly as long as the session; the underlying store is
/// shared and read-only.
pub struct ChatSession<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    user: Identity,
    engine: QueryEngine<C, E>,
}

impl<C, E> ChatSession<C, E>
where
    C: CompletionModel + StreamingCompletionModel + Clone + Send + Sync + 'static,
    E: EmbeddingModel,
{
    pub fn new(user: Identity, engine: QueryEngine<C, E>) -> Self {
        Self { user, engine }
    }

    pub fn user(&self) -> &Identity {
        &self.user
    }

    /// Greeting shown when the session opens.
    pub fn greeting(&self) -> String {
        format!("Hello {}. How are you doing?", self.user.username)
    }

    /// Answer one inbound message through the query engine.
    pub async fn respond(&self, message: &str) -> Result<QueryResponse> {
        Ok(self.engine.query(message).await?)
    }

    /// Run the interactive loop until the user exits or input closes.
    #[instrument(skip(self), fields(user = %self.user.username))]
    pub async fn run(&self) -> Result<()> {
        info!("chat session started");
        println!("{}", self.greeting());
        println!("Type your questions and press Enter. Type 'exit' to end the session.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("You: ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let message = line.trim();
            if message.is_empty() {
                continue;
            }
            if message.eq_ignore_ascii_case("exit") {
                break;
            }

            let response = self.respond(message).await?;
            print!("AI: ");
            std::io::stdout().flush()?;
            match response {
                QueryResponse::Streaming(mut stream) => {
                    while let Some(token) = stream.next().await {
                        print!("{}", token);
                        std::io::stdout().flush()?;
                    }
                    println!();
                }
                QueryResponse::Complete(text) => println!("{}", text),
            }
            println!();
        }

        info!("chat session ended");
        Ok(())
    }
}

/// Read a credential pair from the terminal and authenticate it.
pub async fn login() -> Result<Identity> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("Username: ");
    std::io::stdout().flush()?;
    let username = lines.next_line().await?.unwrap_or_default();

    print!("Password: ");
    std::io::stdout().flush()?;
    let password = lines.next_line().await?.unwrap_or_default();

    authenticate(username.trim(), password.trim())
        .ok_or_else(|| Error::Chat("access denied".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{QueryEngineConfig, ResponseMode};
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};
    use crate::model::Client;
    use crate::store::{ChunkOptions, VectorStore};
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn session() -> ChatSession<MockCompletionModel, MockEmbeddingModel> {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("docs");
        std::fs::create_dir_all(&sources).unwrap();
        std::fs::write(sources.join("a.md"), "## Intro\n\nvector backtesting docs\n").unwrap();

        let embedder = MockEmbeddingModel::new();
        let store = VectorStore::build_or_load(
            &dir.path().join("index"),
            &sources,
            ChunkOptions::default(),
            &embedder,
        )
        .await
        .unwrap();

        let completion = MockCompletionModel::new();
        completion.set_text_response("a helpful answer").await;
        let client = Client::from_models(completion, embedder);
        let config = QueryEngineConfig::builder()
            .similarity_cutoff(0.0)
            .response_mode(ResponseMode::Compact)
            .build();
        let engine = QueryEngine::new(Arc::new(store), client, config);
        let user = authenticate("admin", "admin").unwrap();
        ChatSession::new(user, engine)
    }

    #[tokio::test]
    async fn test_greeting_names_the_user() {
        let session = session().await;
        assert_eq!(session.greeting(), "Hello admin. How are you doing?");
    }

    #[tokio::test]
    async fn test_respond_produces_answer_text() {
        let session = session().await;
        let response = session.respond("what is this about?").await.unwrap();
        let text = response.into_text().await;
        assert_eq!(text, "a helpful answer");
    }
}
