//! Vector index trait for similarity search over chunk embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::VectorMatch;
use crate::error::Result;

/// Similarity metric used both when the index was built and at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cosine similarity of the two vectors.
    #[default]
    Cosine,
    /// Raw inner product, for indexes built from pre-normalised embeddings.
    DotProduct,
}

impl Metric {
    /// Score `a` against `b` under this metric.
    ///
    /// Non-finite scores, from overflowing components, map to `f32::MIN` so
    /// they rank last and fall below any similarity threshold.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let score = match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::DotProduct => dot(a, b),
        };
        if score.is_finite() { score } else { f32::MIN }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

/// Compute cosine similarity between two vectors.
///
/// Accumulates in `f64`, so large components do not overflow the norms.
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    (dot / (norm_a * norm_b)) as f32
}

/// A read-only index mapping chunk ids to embeddings with top-K similarity search.
///
/// Implementations must be side-effect free on the search path so one
/// loaded index can serve concurrent queries without locking, and must
/// break score ties deterministically.
///
/// # Example
///
/// ```rust,ignore
/// use toa_rag::{FlatIndex, VectorIndex};
///
/// let index = FlatIndex::load(&dir.join("vector_store.json"))?;
/// let matches = index.search(&query_embedding, 20).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns at most `top_k` matches ordered by descending similarity
    /// score; an empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidQuery`](crate::RagError::InvalidQuery) if
    /// `top_k` is zero or the embedding does not match the index dimensions.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Dimensionality of the stored embeddings.
    fn dimensions(&self) -> usize;

    /// The metric the index scores with.
    fn metric(&self) -> Metric;

    /// Number of stored embeddings.
    fn len(&self) -> usize;

    /// Returns `true` if the index holds no embeddings.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored chunk ids in index order.
    fn chunk_ids(&self) -> Vec<&str>;
}
