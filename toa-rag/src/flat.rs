//! Exact (flat-scan) vector index persisted as JSON.
//!
//! This module provides [`FlatIndex`], which scores every stored embedding
//! against the query. It is loaded once at startup and shared read-only.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::VectorMatch;
use crate::error::{RagError, Result};
use crate::persist::{read_artifact, write_artifact};
use crate::vectorstore::{Metric, VectorIndex};

/// One stored embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct IndexEntry {
    id: String,
    embedding: Vec<f32>,
}

/// On-disk shape of `vector_store.json`.
#[derive(Debug, Serialize, Deserialize)]
struct VectorStoreFile {
    #[serde(default)]
    metric: Metric,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// An exact nearest-neighbour index over chunk embeddings.
///
/// Entries are kept in insertion order, which doubles as the tie-break for
/// equal scores: identical inputs on an unchanged index always produce the
/// same ranking.
///
/// # Example
///
/// ```rust,ignore
/// use toa_rag::{FlatIndex, Metric, VectorIndex};
///
/// let mut index = FlatIndex::new(Metric::Cosine, 3);
/// index.insert("c1", vec![1.0, 0.0, 0.0])?;
/// let matches = index.search(&[1.0, 0.0, 0.0], 5).await?;
/// ```
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    dimensions: usize,
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
}

impl FlatIndex {
    /// Create an empty index for embeddings of the given dimensionality.
    pub fn new(metric: Metric, dimensions: usize) -> Self {
        Self { metric, dimensions, entries: Vec::new(), ids: HashSet::new() }
    }

    /// Append an embedding.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorruptStore`] if the id is already present, the
    /// dimensionality differs from the index, or a component is not finite.
    pub fn insert(&mut self, id: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        let id = id.into();
        check_embedding(&id, &embedding, self.dimensions)?;
        if !self.ids.insert(id.clone()) {
            return Err(RagError::CorruptStore(format!(
                "duplicate chunk id '{id}' in vector store"
            )));
        }
        self.entries.push(IndexEntry { id, embedding });
        Ok(())
    }

    /// Whether an embedding is stored for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Load an index from a `vector_store.json` artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the file cannot be read and
    /// [`RagError::CorruptStore`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let file: VectorStoreFile = read_artifact(path)?;
        let mut index = Self::new(file.metric, file.dimensions);
        for entry in file.entries {
            index.insert(entry.id, entry.embedding).map_err(|e| match e {
                RagError::CorruptStore(msg) => {
                    RagError::CorruptStore(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?;
        }
        info!(
            path = %path.display(),
            chunk_count = index.entries.len(),
            dimensions = index.dimensions,
            "loaded vector store"
        );
        Ok(index)
    }

    /// Write the index to a `vector_store.json` artifact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let file = VectorStoreFile {
            metric: self.metric,
            dimensions: self.dimensions,
            entries: self.entries.clone(),
        };
        write_artifact(path, &file)
    }
}

fn check_embedding(id: &str, embedding: &[f32], dimensions: usize) -> Result<()> {
    if embedding.len() != dimensions {
        return Err(RagError::CorruptStore(format!(
            "embedding for '{id}' has {} dimensions, index expects {dimensions}",
            embedding.len()
        )));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(RagError::CorruptStore(format!("embedding for '{id}' has non-finite values")));
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        if top_k == 0 {
            return Err(RagError::InvalidQuery("top_k must be greater than zero".to_string()));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimensions {
            return Err(RagError::InvalidQuery(format!(
                "query embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvalidQuery("query embedding has non-finite values".to_string()));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, self.metric.score(&entry.embedding, embedding)))
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        debug!(result_count = scored.len(), top_k, "vector search completed");

        Ok(scored
            .into_iter()
            .map(|(position, score)| VectorMatch {
                chunk_id: self.entries[position].id.clone(),
                score,
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn chunk_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FlatIndex {
        let mut index = FlatIndex::new(Metric::Cosine, 2);
        index.insert("a", vec![1.0, 0.0]).unwrap();
        index.insert("b", vec![0.0, 1.0]).unwrap();
        index.insert("c", vec![1.0, 1.0]).unwrap();
        index
    }

    #[tokio::test]
    async fn ranks_by_cosine_similarity() {
        let matches = index().search(&[1.0, 0.1], 3).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.chunk_id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let mut index = FlatIndex::new(Metric::DotProduct, 1);
        for id in ["x", "y", "z"] {
            index.insert(id, vec![1.0]).unwrap();
        }
        let matches = index.search(&[2.0], 2).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.chunk_id.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);
    }

    #[tokio::test]
    async fn non_finite_scores_rank_last() {
        let mut index = FlatIndex::new(Metric::DotProduct, 2);
        index.insert("overflow", vec![f32::MAX, f32::MAX]).unwrap();
        index.insert("plain", vec![1.0, 0.0]).unwrap();

        let matches = index.search(&[f32::MAX, -f32::MAX], 2).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.chunk_id.as_str()).collect();
        assert_eq!(ids, ["plain", "overflow"]);
        assert_eq!(matches[1].score, f32::MIN);
    }

    #[tokio::test]
    async fn zero_top_k_is_invalid() {
        let err = index().search(&[1.0, 0.0], 0).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn wrong_dimensions_are_invalid() {
        let err = index().search(&[1.0, 0.0, 0.0], 2).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let index = FlatIndex::new(Metric::Cosine, 4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut index = index();
        let err = index.insert("a", vec![0.5, 0.5]).unwrap_err();
        assert!(matches!(err, RagError::CorruptStore(msg) if msg.contains("duplicate")));
    }
}
