//! # toa-rag
//!
//! Citation-aware retrieval over a persisted index of legal cases.
//!
//! ## Overview
//!
//! An index is built offline ([`IndexBuilder`]) and persisted as three JSON
//! artifacts: the vector store, the document store and the index store.
//! At query time the [`StorageContext`] loads and cross-checks them, the
//! [`Retriever`] returns the top-K chunks for a query, and the
//! [`CitationQueryEngine`] turns those chunks into an answer whose `[N]`
//! markers are guaranteed to point at retrieved chunks.
//!
//! - [`FlatIndex`] - exact cosine / dot-product search
//! - [`DocumentStore`] / [`IndexStore`] - chunk text and chunk-to-document mapping
//! - [`CitationQueryEngine`] - cited answers with a case-number footer
//! - [`ApproachExplorer`] - petition drafting and the tree of approaches
//! - [`HashEmbeddingProvider`] / [`MockGenerator`] - offline providers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toa_rag::{CitationQueryEngine, EngineConfig, StorageContext};
//!
//! let config = EngineConfig::default();
//! let storage = StorageContext::load(&config.persist_dir)?;
//! let engine = CitationQueryEngine::from_storage(&storage, embedder, generator, config)?;
//! let answer = engine.query("compensation for medical negligence").await?;
//! println!("{answer}");
//! ```
//!
//! ## Features
//!
//! - `openai` - [`openai::OpenAIEmbeddingProvider`] and [`openai::OpenAIGenerator`]

pub mod approach;
pub mod builder;
pub mod cache;
pub mod chunking;
pub mod citation;
pub mod config;
pub mod docstore;
pub mod document;
pub mod embedding;
pub mod error;
pub mod flat;
pub mod generation;
pub mod indexstore;
pub mod mock;
pub mod persist;
pub mod prompts;
pub mod retriever;
pub mod storage;
pub mod vectorstore;
pub mod workflow;

#[cfg(feature = "openai")]
pub mod openai;

pub use approach::{Approach, MAX_APPROACHES, MIN_APPROACHES, PetitionApproaches};
pub use builder::{IndexBuilder, IndexBuilderBuilder};
pub use cache::QueryCache;
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split_text};
pub use citation::{
    Citation, CitationQueryEngine, CitationSource, DocumentGroup, SourceRef, SynthesizedAnswer,
};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use docstore::DocumentStore;
pub use document::{Chunk, Document, Metadata, Node, RetrievalResult, SearchResult, VectorMatch};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use flat::FlatIndex;
pub use generation::TextGenerator;
pub use indexstore::{IndexNode, IndexStore};
pub use mock::{GenerationCall, HashEmbeddingProvider, MockGenerator};
pub use persist::{DOCSTORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE};
pub use retriever::{Retriever, RetrieverBuilder};
pub use storage::StorageContext;
pub use vectorstore::{Metric, VectorIndex, cosine_similarity};
pub use workflow::{ApproachExplorer, ResolvedApproach};
