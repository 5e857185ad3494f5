//! Index store: structural metadata tying chunks to documents.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RagError, Result};
use crate::persist::{read_artifact, write_artifact};

/// One chunk-to-document mapping, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexNode {
    /// The chunk id.
    pub chunk_id: String,
    /// The parent document id.
    pub document_id: String,
}

/// On-disk shape of `index_store.json`.
#[derive(Debug, Serialize, Deserialize)]
struct IndexStoreFile {
    index_id: String,
    embedding_model: String,
    dimensions: usize,
    nodes: Vec<IndexNode>,
}

/// Structural metadata for a logical index.
///
/// Records which embedding model built the index, so queries embedded with a
/// different model are rejected at load time instead of silently ranking
/// badly, and maps every chunk to its parent document.
#[derive(Debug, Clone)]
pub struct IndexStore {
    index_id: String,
    embedding_model: String,
    dimensions: usize,
    nodes: Vec<IndexNode>,
    by_chunk: HashMap<String, usize>,
}

impl IndexStore {
    /// Create an empty index store.
    pub fn new(
        index_id: impl Into<String>,
        embedding_model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            index_id: index_id.into(),
            embedding_model: embedding_model.into(),
            dimensions,
            nodes: Vec::new(),
            by_chunk: HashMap::new(),
        }
    }

    /// Record that `chunk_id` belongs to `document_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorruptStore`] if the chunk is already mapped.
    pub fn insert(
        &mut self,
        chunk_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Result<()> {
        let chunk_id = chunk_id.into();
        if self.by_chunk.contains_key(&chunk_id) {
            return Err(RagError::CorruptStore(format!(
                "duplicate chunk id '{chunk_id}' in index store"
            )));
        }
        self.by_chunk.insert(chunk_id.clone(), self.nodes.len());
        self.nodes.push(IndexNode { chunk_id, document_id: document_id.into() });
        Ok(())
    }

    /// Resolve a chunk to its parent document id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if the chunk is not part of the index.
    pub fn resolve(&self, chunk_id: &str) -> Result<&str> {
        self.by_chunk
            .get(chunk_id)
            .map(|&position| self.nodes[position].document_id.as_str())
            .ok_or_else(|| RagError::NotFound(chunk_id.to_string()))
    }

    /// Group chunk ids by parent document, preserving first-seen order of
    /// documents and of chunks within each document. Unknown ids are skipped.
    pub fn group_by_document<'a>(
        &self,
        chunk_ids: impl IntoIterator<Item = &'a str>,
    ) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for chunk_id in chunk_ids {
            let Ok(document_id) = self.resolve(chunk_id) else {
                continue;
            };
            match groups.iter_mut().find(|(doc, _)| doc == document_id) {
                Some((_, chunks)) => chunks.push(chunk_id.to_string()),
                None => groups.push((document_id.to_string(), vec![chunk_id.to_string()])),
            }
        }
        groups
    }

    /// Name of the logical index.
    pub fn index_id(&self) -> &str {
        &self.index_id
    }

    /// Embedding model the index was built with.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Embedding dimensionality the index was built with.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Chunk-to-document mappings in index order.
    pub fn nodes(&self) -> &[IndexNode] {
        &self.nodes
    }

    /// Number of distinct parent documents.
    pub fn document_count(&self) -> usize {
        let mut documents: Vec<&str> = self.nodes.iter().map(|n| n.document_id.as_str()).collect();
        documents.sort_unstable();
        documents.dedup();
        documents.len()
    }

    /// Reconstruct the store from an `index_store.json` artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the file cannot be read and
    /// [`RagError::CorruptStore`] if it is malformed or maps a chunk twice.
    pub fn load(path: &Path) -> Result<Self> {
        let file: IndexStoreFile = read_artifact(path)?;
        let mut store = Self::new(file.index_id, file.embedding_model, file.dimensions);
        for node in file.nodes {
            store.insert(node.chunk_id, node.document_id).map_err(|e| match e {
                RagError::CorruptStore(msg) => {
                    RagError::CorruptStore(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?;
        }
        info!(
            path = %path.display(),
            index_id = %store.index_id,
            embedding_model = %store.embedding_model,
            chunk_count = store.nodes.len(),
            "loaded index store"
        );
        Ok(store)
    }

    /// Write the store to an `index_store.json` artifact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let file = IndexStoreFile {
            index_id: self.index_id.clone(),
            embedding_model: self.embedding_model.clone(),
            dimensions: self.dimensions,
            nodes: self.nodes.clone(),
        };
        write_artifact(path, &file)
    }
}
