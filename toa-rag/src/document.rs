//! Data types for documents, chunks, stored nodes, and search results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form key/value attributes attached to a chunk (e.g. `case_number`).
pub type Metadata = BTreeMap<String, String>;

/// A source document (one legal case) before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The full text of the document.
    pub text: String,
    /// Key-value metadata inherited by every chunk of the document.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A segment of a [`Document`] with its vector embedding.
///
/// Chunks only exist while an index is being built; once persisted, the
/// embedding lives in the vector index and the rest in the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: Metadata,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// Split off the embedding, leaving the storable [`Node`].
    pub fn into_parts(self) -> (Node, Vec<f32>) {
        let node = Node {
            id: self.id,
            text: self.text,
            document_id: self.document_id,
            metadata: self.metadata,
        };
        (node, self.embedding)
    }
}

/// The text and metadata of a chunk as held by the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Unique identifier of the chunk.
    pub id: String,
    /// The raw chunk text.
    pub text: String,
    /// The ID of the parent document.
    pub document_id: String,
    /// Source attributes such as the case number.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Node {
    /// Look up a metadata field, treating blank values as absent.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
    }
}

/// A chunk id paired with its similarity score, as produced by a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// The matched chunk id.
    pub chunk_id: String,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A retrieved [`Node`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub node: Node,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The ranked evidence returned for one query.
///
/// Results keep the order produced by the vector index, so scores are
/// non-increasing and there are never more than the requested `top_k`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// The query text the results were retrieved for.
    pub query: String,
    /// Retrieved chunks ordered by descending score.
    pub results: Vec<SearchResult>,
}

impl RetrievalResult {
    /// Returns `true` if nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of retrieved chunks.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the given chunk id is among the retrieved results.
    pub fn contains(&self, chunk_id: &str) -> bool {
        self.results.iter().any(|r| r.node.id == chunk_id)
    }

    /// The retrieved chunk ids in rank order.
    pub fn chunk_ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.node.id.as_str()).collect()
    }
}
