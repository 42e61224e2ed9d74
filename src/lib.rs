//! # QuantGPT - RAG toolchain for quant trading documentation
//!
//! This crate collects a Markdown corpus from a tutorial git repository and a
//! pair of documentation sites, builds a persisted vector index over it, and
//! answers questions through a retrieval-augmented pipeline with streaming
//! responses.
//!
//! ## Pipeline
//!
//! - `collector`: clones the tutorial repository and converts notebooks to Markdown
//! - `harvester`: crawls documentation sites and extracts readable content as Markdown
//! - `store`: chunks the Markdown corpus and builds or loads a persisted vector index
//! - `engine`: wraps the index in a top-k retriever with a similarity cutoff and a
//!   tree-summarize response synthesizer
//! - `chat`: an authenticated, session-scoped chat loop that streams model output
//!
//! ## Example
//!
//! ```rust,no_run
//! use quantgpt::engine::{QueryEngine, QueryEngineConfig};
//! use quantgpt::model::Client;
//! use quantgpt::store::{ChunkOptions, VectorStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new_openai_from_env()?;
//!
//!     let store = VectorStore::build_or_load(
//!         "./index".as_ref(),
//!         "./docs".as_ref(),
//!         ChunkOptions::default(),
//!         client.embedding(),
//!     )
//!     .await?;
//!
//!     let config = QueryEngineConfig::builder()
//!         .model("gpt-4")
//!         .temperature(0.1)
//!         .build();
//!     let engine = QueryEngine::new(Arc::new(store), client, config);
//!
//!     let response = engine.query("How do I align multi-timeframe data?").await?;
//!     println!("{}", response.into_text().await);
//!     Ok(())
//! }
//! ```

mod config;
mod error;

pub mod chat;
pub mod collector;
pub mod engine;
pub mod harvester;
pub mod model;
pub mod store;

pub use config::AppConfig;
pub use error::Error;

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::error::Error;
    pub use crate::error::Result;
}
