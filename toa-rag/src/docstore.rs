//! Document store holding chunk text and metadata by chunk id.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::Node;
use crate::error::{RagError, Result};
use crate::persist::{read_artifact, write_artifact};

/// On-disk shape of `docstore.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DocstoreFile {
    nodes: BTreeMap<String, Node>,
}

/// Chunk text and metadata addressable by chunk id.
///
/// Built once and then shared read-only; lookups never mutate.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    nodes: BTreeMap<String, Node>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the text and metadata of a chunk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if the id is absent.
    pub fn get(&self, chunk_id: &str) -> Result<&Node> {
        self.nodes.get(chunk_id).ok_or_else(|| RagError::NotFound(chunk_id.to_string()))
    }

    /// Add a node.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorruptStore`] if the id is already present.
    pub fn insert(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(RagError::CorruptStore(format!(
                "duplicate chunk id '{}' in document store",
                node.id
            )));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Whether a node is stored for `chunk_id`.
    pub fn contains(&self, chunk_id: &str) -> bool {
        self.nodes.contains_key(chunk_id)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All chunk ids in sorted order.
    pub fn chunk_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Reconstruct the store from a `docstore.json` artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the file cannot be read and
    /// [`RagError::CorruptStore`] if it is malformed or a node is filed under
    /// a key other than its own id.
    pub fn load(path: &Path) -> Result<Self> {
        let file: DocstoreFile = read_artifact(path)?;
        if let Some((key, node)) = file.nodes.iter().find(|(key, node)| **key != node.id) {
            return Err(RagError::CorruptStore(format!(
                "{}: node '{}' stored under key '{key}'",
                path.display(),
                node.id
            )));
        }
        info!(path = %path.display(), chunk_count = file.nodes.len(), "loaded document store");
        Ok(Self { nodes: file.nodes })
    }

    /// Write the store to a `docstore.json` artifact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        write_artifact(path, &DocstoreFile { nodes: self.nodes.clone() })
    }
}
