//! Error types for the `toa-rag` crate.

use thiserror::Error;

/// Errors that can occur while loading an index or answering a query.
///
/// Load-time variants ([`IndexUnavailable`](RagError::IndexUnavailable),
/// [`CorruptStore`](RagError::CorruptStore),
/// [`ConfigMismatch`](RagError::ConfigMismatch)) are fatal at startup.
/// Per-query variants are returned to the caller, who owns any retry policy.
#[derive(Debug, Error)]
pub enum RagError {
    /// A persisted artifact is missing or cannot be read.
    #[error("Index unavailable at {path}: {message}")]
    IndexUnavailable {
        /// The artifact path that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// Persisted artifacts are present but structurally invalid or mutually inconsistent.
    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    /// The configured embedding model disagrees with the persisted index or
    /// with the query-time embedding provider.
    #[error("Configuration mismatch for {field}: found '{found}', configured '{expected}'")]
    ConfigMismatch {
        /// The mismatching setting.
        field: String,
        /// The value configured at query time.
        expected: String,
        /// The value recorded in the persisted index or served by the provider.
        found: String,
    },

    /// The query text or search parameters are invalid.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A chunk identifier is absent from a store.
    #[error("Chunk not found: {0}")]
    NotFound(String),

    /// The generative collaborator failed or returned no content.
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Structured approach output failed validation.
    #[error("Invalid approaches: {0}")]
    InvalidApproaches(String),

    /// Writing a persisted artifact failed.
    #[error("Persist failed at {path}: {message}")]
    PersistFailed {
        /// The artifact path that could not be written.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
