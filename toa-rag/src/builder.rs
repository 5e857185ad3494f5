//! Offline index building: documents → chunks → embeddings → stores.
//!
//! The [`IndexBuilder`] produces a [`StorageContext`] whose three stores are
//! consistent by construction; [`StorageContext::persist`] then writes the
//! directory that query-time processes load.
//!
//! # Example
//!
//! ```rust,ignore
//! use toa_rag::{IndexBuilder, RecursiveChunker};
//!
//! let builder = IndexBuilder::builder()
//!     .embedding_provider(Arc::new(embedder))
//!     .chunker(Arc::new(RecursiveChunker::new(1024, 100)))
//!     .index_id("supreme-court")
//!     .build()?;
//!
//! let storage = builder.build(&documents).await?;
//! storage.persist(Path::new("storage"))?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::docstore::DocumentStore;
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::flat::FlatIndex;
use crate::indexstore::IndexStore;
use crate::storage::StorageContext;
use crate::vectorstore::Metric;

const DEFAULT_INDEX_ID: &str = "default";

/// Turns documents into a persisted-ready [`StorageContext`].
pub struct IndexBuilder {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    index_id: String,
    metric: Metric,
}

impl IndexBuilder {
    /// Create a new [`IndexBuilderBuilder`].
    pub fn builder() -> IndexBuilderBuilder {
        IndexBuilderBuilder::default()
    }

    /// Chunk and embed one document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if embedding fails, naming the document.
    pub async fn embed_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        let mut chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "embedded document (empty)");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during indexing");
            RagError::EmbeddingError {
                provider: self.embedding_provider.model().to_string(),
                message: format!("embedding failed for document '{}': {e}", document.id),
            }
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.model().to_string(),
                message: format!(
                    "expected {} embeddings for document '{}', got {}",
                    chunks.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        info!(document.id = %document.id, chunk_count = chunks.len(), "embedded document");
        Ok(chunks)
    }

    /// Build consistent vector, document, and index stores for `documents`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] on the first document that fails
    /// to embed and [`RagError::CorruptStore`] if two chunks share an id.
    pub async fn build(&self, documents: &[Document]) -> Result<StorageContext> {
        let dimensions = self.embedding_provider.dimensions();
        let mut vector_index = FlatIndex::new(self.metric, dimensions);
        let mut docstore = DocumentStore::new();
        let mut index_store =
            IndexStore::new(&self.index_id, self.embedding_provider.model(), dimensions);

        for document in documents {
            for chunk in self.embed_document(document).await? {
                let (node, embedding) = chunk.into_parts();
                vector_index.insert(node.id.clone(), embedding)?;
                index_store.insert(node.id.clone(), node.document_id.clone())?;
                docstore.insert(node)?;
            }
        }

        let storage = StorageContext::from_parts(vector_index, docstore, index_store)?;
        info!(
            index_id = %self.index_id,
            document_count = documents.len(),
            chunk_count = storage.chunk_count(),
            "built index"
        );
        Ok(storage)
    }
}

/// Builder for constructing an [`IndexBuilder`].
///
/// The embedding provider and chunker are required.
#[derive(Default)]
pub struct IndexBuilderBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    index_id: Option<String>,
    metric: Metric,
}

impl IndexBuilderBuilder {
    /// Set the embedding provider; its model id is recorded in the index store.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Name the logical index. Defaults to `default`.
    pub fn index_id(mut self, index_id: impl Into<String>) -> Self {
        self.index_id = Some(index_id.into());
        self
    }

    /// Set the similarity metric. Defaults to cosine.
    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Build the [`IndexBuilder`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// index id is blank.
    pub fn build(self) -> Result<IndexBuilder> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;
        let index_id = self.index_id.unwrap_or_else(|| DEFAULT_INDEX_ID.to_string());
        if index_id.trim().is_empty() {
            return Err(RagError::ConfigError("index_id must not be empty".to_string()));
        }

        Ok(IndexBuilder { embedding_provider, chunker, index_id, metric: self.metric })
    }
}
