//! Configuration for the retrieval engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for loading an index and answering queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the persisted vector, document, and index stores.
    pub persist_dir: PathBuf,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Identifier of the embedding model the index was built with.
    pub embedding_model: String,
    /// Minimum similarity score for results (results below this are dropped).
    pub similarity_threshold: Option<f32>,
    /// Maximum size in characters of each numbered citation source.
    pub citation_chunk_size: usize,
    /// Overlap in characters between consecutive citation sources.
    pub citation_chunk_overlap: usize,
    /// Maximum number of memoized answers. Zero disables the cache.
    pub cache_capacity: usize,
    /// Metadata field shown in the sources footer.
    pub source_metadata_key: String,
    /// How many of the top retrieved chunks contribute to the sources footer.
    pub footer_sources: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("storage"),
            top_k: 20,
            embedding_model: "text-embedding-ada-002".to_string(),
            similarity_threshold: None,
            citation_chunk_size: 512,
            citation_chunk_overlap: 20,
            cache_capacity: 128,
            source_metadata_key: "case_number".to_string(),
            footer_sources: 2,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - `citation_chunk_size == 0`
    /// - `citation_chunk_overlap >= citation_chunk_size`
    /// - `embedding_model` is blank
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.citation_chunk_size == 0 {
            return Err(RagError::ConfigError(
                "citation_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.citation_chunk_overlap >= self.citation_chunk_size {
            return Err(RagError::ConfigError(format!(
                "citation_chunk_overlap ({}) must be less than citation_chunk_size ({})",
                self.citation_chunk_overlap, self.citation_chunk_size
            )));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(RagError::ConfigError("embedding_model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the persisted index directory.
    pub fn persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.persist_dir = dir.into();
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the embedding model identifier expected in the persisted index.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the size and overlap of numbered citation sources.
    pub fn citation_chunking(mut self, size: usize, overlap: usize) -> Self {
        self.config.citation_chunk_size = size;
        self.config.citation_chunk_overlap = overlap;
        self
    }

    /// Set the answer cache capacity. Zero disables caching.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the metadata key shown in the sources footer.
    pub fn source_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.config.source_metadata_key = key.into();
        self
    }

    /// Set how many top results contribute to the sources footer.
    pub fn footer_sources(mut self, count: usize) -> Self {
        self.config.footer_sources = count;
        self
    }

    /// Build the [`EngineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::validate`].
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.top_k, 20);
        assert_eq!(config.persist_dir, PathBuf::from("storage"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_top_k() {
        let err = EngineConfig::builder().top_k(0).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = EngineConfig::builder().citation_chunking(100, 100).build().unwrap_err();
        assert!(
            matches!(err, RagError::ConfigError(msg) if msg.contains("citation_chunk_overlap"))
        );
    }

    #[test]
    fn deserializes_partial_config_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "top_k": 5, "similarity_threshold": 0.3 }"#).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.similarity_threshold, Some(0.3));
        assert_eq!(config.source_metadata_key, "case_number");
    }
}
