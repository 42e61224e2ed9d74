//! # Document Store Module
//!
//! Builds and loads the persisted vector index over the Markdown corpus. This
//! is the retrieval substrate: documents are chunked at heading boundaries,
//! embedded in rate-limited batches, persisted once, and loaded read-only on
//! every later startup.
//!
//! ## Key Components
//!
//! - `list_sources`: corpus walk with the fixed file-name denylist
//! - `VectorStore::build_or_load`: explicit load-or-build lifecycle
//! - `VectorStore::top_k`: cosine-similarity retrieval
//!
//! A present-but-unreadable index surfaces as `StoreError::Corrupt` rather
//! than being rebuilt over; only a missing directory triggers a build.

mod chunking;
mod error;
mod persist;

pub use chunking::{chunk_markdown, ChunkOptions, NodeText};
pub use error::StoreError;
pub use persist::{Manifest, FORMAT_VERSION};

use indicatif::{ProgressBar, ProgressStyle};
use rig::embeddings::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// File names never indexed, regardless of where they sit in the corpus
pub const EXCLUDED_SOURCES: [&str; 4] = ["api.md", "all_pages.md", "unknown.md", "chainlit.md"];

/// Number of texts sent to the embedding model per request
const EMBED_BATCH: usize = 64;

/// A chunk of a source document with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNode {
    /// Path of the source document
    pub source: String,

    /// Position of the chunk within its document
    pub position: usize,

    /// Heading of the section the chunk came from
    pub heading: Option<String>,

    /// Chunk text
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f64>,
}

/// A retrieved node with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredNode {
    pub node: IndexNode,
    pub score: f64,
}

/// List every indexable Markdown file under `folder`, recursively.
///
/// Files named in [`EXCLUDED_SOURCES`] are skipped wherever they appear.
/// Traversal order follows the filesystem and is not guaranteed stable
/// across platforms.
pub fn list_sources(folder: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut sources = Vec::new();
    walk_markdown(folder, &mut sources)?;
    Ok(sources)
}

fn walk_markdown(dir: &Path, sources: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_markdown(&path, sources)?;
            continue;
        }
        if path.extension().is_none_or(|e| e != "md") {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if EXCLUDED_SOURCES.contains(&name.as_str()) {
            debug!("Excluding {}", path.display());
            continue;
        }
        sources.push(path);
    }
    Ok(())
}

/// The in-memory vector index, read-only after construction
#[derive(Debug, Clone)]
pub struct VectorStore {
    manifest: Manifest,
    nodes: Vec<IndexNode>,
}

impl VectorStore {
    /// Load the index from `persist_dir`, or build and persist it when the
    /// directory does not exist.
    ///
    /// Loading never touches the source folder. A directory that exists but
    /// cannot be read back returns [`StoreError::Corrupt`]; rebuilding over it
    /// requires deleting it first.
    #[instrument(skip(embedder, options))]
    pub async fn build_or_load<E: EmbeddingModel>(
        persist_dir: &Path,
        source_folder: &Path,
        options: ChunkOptions,
        embedder: &E,
    ) -> Result<Self, StoreError> {
        if persist_dir.exists() {
            info!("Loading index from {}", persist_dir.display());
            return Self::load(persist_dir).await;
        }

        info!("No index at {}, building a new one", persist_dir.display());
        let store = Self::build(source_folder, options, embedder).await?;
        info!("Saving index to {}", persist_dir.display());
        persist::save(persist_dir, &store.manifest, &store.nodes).await?;
        Ok(store)
    }

    /// Load a persisted index.
    pub async fn load(persist_dir: &Path) -> Result<Self, StoreError> {
        let (manifest, nodes) = persist::load(persist_dir).await?;
        Ok(Self { manifest, nodes })
    }

    /// Build an index from every eligible document under `source_folder`.
    #[instrument(skip(embedder, options))]
    pub async fn build<E: EmbeddingModel>(
        source_folder: &Path,
        options: ChunkOptions,
        embedder: &E,
    ) -> Result<Self, StoreError> {
        let sources = list_sources(source_folder)?;
        info!(
            "Reading {} documents from {}",
            sources.len(),
            source_folder.display()
        );

        let mut pending: Vec<(String, NodeText)> = Vec::new();
        for source in &sources {
            let content = tokio::fs::read_to_string(source).await?;
            let chunks = chunk_markdown(&content, &options);
            if chunks.is_empty() {
                warn!("No content in {}", source.display());
            }
            let source = source.to_string_lossy().to_string();
            pending.extend(chunks.into_iter().map(|c| (source.clone(), c)));
        }

        info!("Embedding {} chunks", pending.len());
        let nodes = embed_pending(pending, embedder).await?;

        let manifest = Manifest {
            version: FORMAT_VERSION,
            ndims: embedder.ndims(),
            chunk_size: options.chunk_size,
            overlap: options.overlap,
            node_count: nodes.len(),
            built_at: chrono::Utc::now(),
        };

        Ok(Self { manifest, nodes })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The `k` nodes most similar to the query embedding, best first.
    pub fn top_k(&self, query_embedding: &[f64], k: usize) -> Vec<ScoredNode> {
        let mut scored: Vec<ScoredNode> = self
            .nodes
            .iter()
            .map(|node| ScoredNode {
                node: node.clone(),
                score: cosine_similarity(query_embedding, &node.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Embed chunk texts in batches and pair them back with their sources.
async fn embed_pending<E: EmbeddingModel>(
    pending: Vec<(String, NodeText)>,
    embedder: &E,
) -> Result<Vec<IndexNode>, StoreError> {
    let batch_size = EMBED_BATCH.min(E::MAX_DOCUMENTS.max(1));
    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message("Embedding chunks");

    let mut nodes = Vec::with_capacity(pending.len());
    for batch in pending.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|(_, c)| c.text.clone()).collect();
        let embeddings = embedder
            .embed_texts(texts)
            .await
            .map_err(|e| StoreError::Embedding(e.to_string()))?;
        if embeddings.len() != batch.len() {
            return Err(StoreError::Embedding(format!(
                "embedding batch returned {} vectors for {} texts",
                embeddings.len(),
                batch.len()
            )));
        }
        for ((source, chunk), embedding) in batch.iter().zip(embeddings) {
            nodes.push(IndexNode {
                source: source.clone(),
                position: chunk.position,
                heading: chunk.heading.clone(),
                text: chunk.text.clone(),
                embedding: embedding.vec,
            });
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("Embedding finished");
    Ok(nodes)
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockEmbeddingModel;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_list_sources_applies_denylist_recursively() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("keep.md"), "# a");
        write(&dir.path().join("api.md"), "# excluded");
        write(&dir.path().join("sub/nested.md"), "# b");
        write(&dir.path().join("sub/chainlit.md"), "# excluded");
        write(&dir.path().join("sub/all_pages.md"), "# excluded");
        write(&dir.path().join("sub/unknown.md"), "# excluded");
        write(&dir.path().join("sub/notes.txt"), "not markdown");

        let sources = list_sources(dir.path()).unwrap();
        let names: HashSet<String> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            HashSet::from(["keep.md".to_string(), "nested.md".to_string()])
        );
    }

    #[test]
    fn test_list_sources_empty_folder() {
        let dir = tempdir().unwrap();
        assert!(list_sources(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_creates_persist_dir() {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("docs");
        write(&sources.join("a.md"), "## One\n\nalpha beta gamma\n");
        write(&sources.join("b.md"), "## Two\n\ndelta epsilon\n");
        let persist_dir = dir.path().join("index");

        let store = VectorStore::build_or_load(
            &persist_dir,
            &sources,
            ChunkOptions::default(),
            &MockEmbeddingModel::new(),
        )
        .await
        .unwrap();

        assert!(persist_dir.exists());
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.manifest().node_count, 2);
        assert_eq!(store.manifest().ndims, 8);
    }

    #[tokio::test]
    async fn test_load_does_not_read_sources() {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("docs");
        write(&sources.join("a.md"), "## One\n\nsome indexed text\n");
        let persist_dir = dir.path().join("index");
        let embedder = MockEmbeddingModel::new();

        let built =
            VectorStore::build_or_load(&persist_dir, &sources, ChunkOptions::default(), &embedder)
                .await
                .unwrap();

        // Remove the corpus entirely; loading must still succeed.
        std::fs::remove_dir_all(&sources).unwrap();
        let loaded =
            VectorStore::build_or_load(&persist_dir, &sources, ChunkOptions::default(), &embedder)
                .await
                .unwrap();

        assert_eq!(loaded.node_count(), built.node_count());
    }

    #[tokio::test]
    async fn test_corrupt_index_is_not_rebuilt() {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("docs");
        write(&sources.join("a.md"), "content\n");
        let persist_dir = dir.path().join("index");
        std::fs::create_dir_all(&persist_dir).unwrap();
        write(&persist_dir.join("manifest.json"), "garbage");

        let err = VectorStore::build_or_load(
            &persist_dir,
            &sources,
            ChunkOptions::default(),
            &MockEmbeddingModel::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { .. }));
        // The broken directory is left untouched.
        assert_eq!(
            std::fs::read_to_string(persist_dir.join("manifest.json")).unwrap(),
            "garbage"
        );
    }

    #[tokio::test]
    async fn test_top_k_orders_by_similarity() {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("docs");
        write(&sources.join("a.md"), "alpha alpha alpha\n");
        write(&sources.join("b.md"), "zzz completely different text\n");
        let persist_dir = dir.path().join("index");
        let embedder = MockEmbeddingModel::new();

        let store =
            VectorStore::build_or_load(&persist_dir, &sources, ChunkOptions::default(), &embedder)
                .await
                .unwrap();

        let query = embedder
            .embed_texts(vec!["alpha alpha alpha".to_string()])
            .await
            .unwrap()
            .remove(0);

        let results = store.top_k(&query.vec, 2);
        assert_eq!(results.len(), 2);
        assert!(results[0].score >= results[1].score);
        assert!(results[0].node.text.contains("alpha"));
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
