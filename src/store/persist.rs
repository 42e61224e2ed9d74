//! Persisted index layout
//!
//! A persisted index is a directory holding `manifest.json` (format version,
//! embedding dimensions, chunk options, node count, build timestamp) and
//! `nodes.json` (every node with its embedding). The layout is written once at
//! build time and read back on every startup; it is never updated in place.

use super::error::StoreError;
use super::IndexNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Current persisted format version
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const NODES_FILE: &str = "nodes.json";

/// Metadata describing a persisted index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Persisted format version
    pub version: u32,

    /// Embedding vector dimensions
    pub ndims: usize,

    /// Chunk size in words used at build time
    pub chunk_size: usize,

    /// Chunk overlap in words used at build time
    pub overlap: usize,

    /// Number of nodes in the index
    pub node_count: usize,

    /// When the index was built
    pub built_at: DateTime<Utc>,
}

/// Write the manifest and nodes into `persist_dir`, creating it if needed.
pub async fn save(
    persist_dir: &Path,
    manifest: &Manifest,
    nodes: &[IndexNode],
) -> Result<(), StoreError> {
    tokio::fs::create_dir_all(persist_dir).await?;

    let manifest_json = serde_json::to_string_pretty(manifest)?;
    tokio::fs::write(persist_dir.join(MANIFEST_FILE), manifest_json).await?;

    let nodes_json = serde_json::to_string(nodes)?;
    tokio::fs::write(persist_dir.join(NODES_FILE), nodes_json).await?;

    debug!(
        "Persisted {} nodes to {}",
        nodes.len(),
        persist_dir.display()
    );
    Ok(())
}

/// Read a persisted index back from `persist_dir`.
///
/// The caller has already established that the directory exists, so every
/// failure here means the index is unreadable, not absent.
pub async fn load(persist_dir: &Path) -> Result<(Manifest, Vec<IndexNode>), StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: persist_dir.to_path_buf(),
        reason,
    };

    let manifest_raw = tokio::fs::read_to_string(persist_dir.join(MANIFEST_FILE))
        .await
        .map_err(|e| corrupt(format!("cannot read {}: {}", MANIFEST_FILE, e)))?;
    let manifest: Manifest = serde_json::from_str(&manifest_raw)
        .map_err(|e| corrupt(format!("cannot parse {}: {}", MANIFEST_FILE, e)))?;

    if manifest.version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {} (expected {})",
            manifest.version, FORMAT_VERSION
        )));
    }

    let nodes_raw = tokio::fs::read_to_string(persist_dir.join(NODES_FILE))
        .await
        .map_err(|e| corrupt(format!("cannot read {}: {}", NODES_FILE, e)))?;
    let nodes: Vec<IndexNode> = serde_json::from_str(&nodes_raw)
        .map_err(|e| corrupt(format!("cannot parse {}: {}", NODES_FILE, e)))?;

    if nodes.len() != manifest.node_count {
        return Err(corrupt(format!(
            "manifest claims {} nodes, found {}",
            manifest.node_count,
            nodes.len()
        )));
    }

    debug!(
        "Loaded {} nodes from {}",
        nodes.len(),
        persist_dir.display()
    );
    Ok((manifest, nodes))
}
