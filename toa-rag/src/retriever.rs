//! Embedding retriever: query text → ranked chunks from the document store.
//!
//! The [`Retriever`] embeds the query with the same provider the index was
//! built with, runs a top-K similarity search, and fetches each match from
//! the [`DocumentStore`]. Matches whose text is missing are skipped and
//! logged rather than failing the whole retrieval.
//!
//! # Example
//!
//! ```rust,ignore
//! use toa_rag::{EngineConfig, Retriever, StorageContext};
//!
//! let storage = StorageContext::load(&config.persist_dir)?;
//! let retriever = Retriever::from_storage(&storage, Arc::new(embedder), &config)?;
//! let result = retriever.retrieve("dishonour of cheque by insurer").await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::docstore::DocumentStore;
use crate::document::{RetrievalResult, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::storage::StorageContext;
use crate::vectorstore::VectorIndex;

/// Converts free-text queries into ranked, grounded evidence.
///
/// Holds only shared read-only state, so one retriever can serve
/// concurrent queries. Construct one via [`Retriever::builder()`] or
/// [`Retriever::from_storage()`].
pub struct Retriever {
    vector_index: Arc<dyn VectorIndex>,
    docstore: Arc<DocumentStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Wire a retriever over a loaded [`StorageContext`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigMismatch`] if `config.embedding_model`
    /// differs from the model the index was built with or from the model
    /// `embedding_provider` serves, or if the dimensionality disagrees.
    /// Returns [`RagError::ConfigError`] if `config` is invalid.
    pub fn from_storage(
        storage: &StorageContext,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        storage.verify_embedding(&config.embedding_model, embedding_provider.dimensions())?;
        if embedding_provider.model() != config.embedding_model {
            error!(
                configured = %config.embedding_model,
                provider = embedding_provider.model(),
                "embedding provider does not serve the configured model"
            );
            return Err(RagError::ConfigMismatch {
                field: "embedding_model".to_string(),
                expected: config.embedding_model.clone(),
                found: embedding_provider.model().to_string(),
            });
        }
        let mut builder = Self::builder()
            .vector_index(storage.vector_index())
            .docstore(storage.docstore())
            .embedding_provider(embedding_provider)
            .top_k(config.top_k);
        if let Some(threshold) = config.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        builder.build()
    }

    /// The configured number of results per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve the configured top-K chunks for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidQuery`] for blank text, and propagates
    /// embedding and search failures.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_with_top_k(query, self.top_k).await
    }

    /// Retrieve with an explicit `top_k`, bypassing the configured value.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidQuery`] for blank text or `top_k == 0`.
    pub async fn retrieve_with_top_k(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidQuery("query text must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::InvalidQuery("top_k must be greater than zero".to_string()));
        }

        // 1. Embed the query
        let query_embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
        })?;

        // 2. Search the vector index
        let matches = self.vector_index.search(&query_embedding, top_k).await.inspect_err(|e| {
            error!(error = %e, "vector search failed");
        })?;
        debug!(match_count = matches.len(), top_k, "vector search returned");

        // 3. Fetch text and metadata, skipping ids the document store lacks
        let mut results = Vec::with_capacity(matches.len());
        let mut skipped = 0usize;
        for vector_match in matches {
            if let Some(threshold) = self.similarity_threshold {
                if vector_match.score < threshold {
                    continue;
                }
            }
            match self.docstore.get(&vector_match.chunk_id) {
                Ok(node) => {
                    results.push(SearchResult { node: node.clone(), score: vector_match.score });
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        chunk_id = %vector_match.chunk_id,
                        error = %e,
                        "vector match has no stored text, skipping"
                    );
                }
            }
        }

        info!(result_count = results.len(), skipped, "retrieval completed");

        Ok(RetrievalResult { query: query.to_string(), results })
    }
}

/// Builder for constructing a [`Retriever`].
///
/// The vector index, document store, and embedding provider are required.
#[derive(Default)]
pub struct RetrieverBuilder {
    vector_index: Option<Arc<dyn VectorIndex>>,
    docstore: Option<Arc<DocumentStore>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    top_k: Option<usize>,
    similarity_threshold: Option<f32>,
}

impl RetrieverBuilder {
    /// Set the vector index to search.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the document store results are fetched from.
    pub fn docstore(mut self, docstore: Arc<DocumentStore>) -> Self {
        self.docstore = Some(docstore);
        self
    }

    /// Set the query embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the number of results per query. Defaults to the [`EngineConfig`] default.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Drop results scoring below `threshold`.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Build the [`Retriever`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// `top_k` is zero.
    pub fn build(self) -> Result<Retriever> {
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::ConfigError("vector_index is required".to_string()))?;
        let docstore =
            self.docstore.ok_or_else(|| RagError::ConfigError("docstore is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let top_k = self.top_k.unwrap_or_else(|| EngineConfig::default().top_k);
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }

        Ok(Retriever {
            vector_index,
            docstore,
            embedding_provider,
            top_k,
            similarity_threshold: self.similarity_threshold,
        })
    }
}
