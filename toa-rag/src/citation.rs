//! Citation-aware query engine.
//!
//! The [`CitationQueryEngine`] retrieves evidence, splits it into numbered
//! sources, asks the [`TextGenerator`] for an answer that cites those numbers,
//! and then checks every `[N]` marker against the sources it actually sent.
//! Markers naming a source that was never retrieved are removed, so an
//! answer can only cite chunks from its own [`RetrievalResult`].
//!
//! # Example
//!
//! ```rust,ignore
//! use toa_rag::{CitationQueryEngine, EngineConfig, StorageContext};
//!
//! let storage = StorageContext::load(&config.persist_dir)?;
//! let engine = CitationQueryEngine::from_storage(&storage, embedder, generator, config)?;
//! let answer = engine.query("precedents on repudiation of marine insurance claims").await?;
//! println!("{}", answer.render());
//! ```

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::QueryCache;
use crate::chunking::split_text;
use crate::config::EngineConfig;
use crate::document::{Metadata, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::indexstore::IndexStore;
use crate::prompts::{CITATION_QA, NO_SOURCES_RESPONSE, fill};
use crate::retriever::Retriever;
use crate::storage::StorageContext;

/// Matches `[3]` and `[1, 4]` style citation markers.
///
/// Source numbers are at most three digits, so bracketed years such as the
/// neutral citation `[2013] UKSC 5` are left untouched.
const MARKER_PATTERN: &str = r"\[\s*(\d{1,3}(?:\s*,\s*\d{1,3})*)\s*\]";

/// A numbered piece of retrieved text offered to the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitationSource {
    /// 1-based number the generator cites.
    pub number: usize,
    /// The retrieved chunk this text was cut from.
    pub chunk_id: String,
    /// The chunk's parent document.
    pub document_id: String,
    /// The source text.
    pub text: String,
    /// Similarity score of the parent chunk.
    pub score: f32,
    /// Metadata of the parent chunk.
    pub metadata: Metadata,
}

/// One validated citation marker in the answer text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// The cited source number.
    pub source: usize,
    /// The retrieved chunk the source belongs to.
    pub chunk_id: String,
    /// Byte offset where the marker starts in [`SynthesizedAnswer::response`].
    pub start: usize,
    /// Byte offset just past the marker.
    pub end: usize,
}

/// A cited chunk, listed once in order of first citation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// The cited chunk id.
    pub chunk_id: String,
    /// Parent document of the chunk.
    pub document_id: String,
    /// Chunk metadata such as the case number.
    pub metadata: Metadata,
}

/// Cited chunks grouped under their parent document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentGroup {
    /// The parent document id.
    pub document_id: String,
    /// Cited chunks of that document, in order of first citation.
    pub chunk_ids: Vec<String>,
}

/// A generated answer with traceable citations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesizedAnswer {
    /// The query the answer responds to.
    pub query: String,
    /// Narrative text with validated `[N]` markers.
    pub response: String,
    /// Every marker in `response`, in text order.
    pub citations: Vec<Citation>,
    /// Cited chunks in order of first citation.
    pub sources: Vec<SourceRef>,
    /// Distinguishing metadata (e.g. case numbers) of the top retrieved chunks.
    pub footer: Vec<String>,
    /// Cited chunks grouped by parent document.
    pub documents: Vec<DocumentGroup>,
}

impl SynthesizedAnswer {
    fn no_sources(query: &str) -> Self {
        Self {
            query: query.to_string(),
            response: NO_SOURCES_RESPONSE.to_string(),
            citations: Vec::new(),
            sources: Vec::new(),
            footer: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Returns `true` if the answer cites at least one chunk.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// The cited chunk ids in order of first citation.
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.chunk_id.as_str()).collect()
    }

    /// The response followed by the sources footer, when there is one.
    pub fn render(&self) -> String {
        if self.footer.is_empty() {
            self.response.clone()
        } else {
            format!("{}\n\nSources: {}", self.response, self.footer.join(" & "))
        }
    }
}

impl fmt::Display for SynthesizedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Answers queries from retrieved evidence with verified citations.
pub struct CitationQueryEngine {
    retriever: Arc<Retriever>,
    generator: Arc<dyn TextGenerator>,
    index_store: Option<Arc<IndexStore>>,
    config: EngineConfig,
    marker: Regex,
    cache: Option<QueryCache<SynthesizedAnswer>>,
}

impl CitationQueryEngine {
    /// Create an engine over an existing retriever.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `config` is invalid.
    pub fn new(
        retriever: Arc<Retriever>,
        generator: Arc<dyn TextGenerator>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let marker = Regex::new(MARKER_PATTERN)
            .map_err(|e| RagError::ConfigError(format!("invalid citation marker pattern: {e}")))?;
        let cache = QueryCache::new(config.cache_capacity);
        Ok(Self { retriever, generator, index_store: None, config, marker, cache })
    }

    /// Resolve parent documents through `index_store` when grouping citations.
    pub fn with_index_store(mut self, index_store: Arc<IndexStore>) -> Self {
        self.index_store = Some(index_store);
        self
    }

    /// Wire the full engine over a loaded [`StorageContext`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigMismatch`] if the index was built with a
    /// different embedding model, and [`RagError::ConfigError`] if `config`
    /// is invalid.
    pub fn from_storage(
        storage: &StorageContext,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
        config: EngineConfig,
    ) -> Result<Self> {
        let retriever = Retriever::from_storage(storage, embedding_provider, &config)?;
        Ok(Self::new(Arc::new(retriever), generator, config)?
            .with_index_store(storage.index_store()))
    }

    /// The underlying retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Number of memoised answers; always zero when caching is disabled.
    pub async fn cached_answers(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.len().await,
            None => 0,
        }
    }

    /// Retrieve evidence for `query` and synthesize a cited answer.
    ///
    /// Successful answers are memoised by query text when a cache is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidQuery`] for blank text,
    /// [`RagError::SynthesisFailed`] if generation fails or returns nothing,
    /// and propagates embedding and search failures.
    pub async fn query(&self, query: &str) -> Result<SynthesizedAnswer> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidQuery("query text must not be empty".to_string()));
        }
        if let Some(cache) = &self.cache {
            if let Some(answer) = cache.get(query).await {
                debug!("answer served from cache");
                return Ok(answer);
            }
        }

        let retrieval = self.retriever.retrieve(query).await?;
        let answer = self.synthesize(&retrieval).await?;

        if let Some(cache) = &self.cache {
            cache.put(query, answer.clone()).await;
        }
        Ok(answer)
    }

    /// Synthesize a cited answer from an existing retrieval.
    ///
    /// An empty retrieval produces an answer stating that no sources were
    /// found, without calling the generator.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SynthesisFailed`] if the generator errors or
    /// returns blank text.
    pub async fn synthesize(&self, retrieval: &RetrievalResult) -> Result<SynthesizedAnswer> {
        if retrieval.is_empty() {
            info!(query = %retrieval.query, "no sources retrieved");
            return Ok(SynthesizedAnswer::no_sources(&retrieval.query));
        }

        let sources = self.citation_sources(retrieval);
        let context = render_context(&sources);
        let prompt = fill(CITATION_QA, &[("query", retrieval.query.as_str())]);

        let narrative = self.generator.generate(&prompt, &context).await.map_err(|e| {
            error!(generator = self.generator.name(), error = %e, "generation failed");
            match e {
                RagError::SynthesisFailed(_) => e,
                other => RagError::SynthesisFailed(other.to_string()),
            }
        })?;
        if narrative.trim().is_empty() {
            error!(generator = self.generator.name(), "generator returned empty content");
            return Err(RagError::SynthesisFailed("generator returned empty content".to_string()));
        }

        let (response, citations) = resolve_citations(&self.marker, narrative.trim(), &sources);
        let sources_cited = cited_sources(&citations, &sources);
        if sources_cited.is_empty() {
            warn!(query = %retrieval.query, "answer cites no sources");
        }
        let documents = self.group_documents(&sources_cited);
        let footer = self.footer(retrieval);

        info!(
            citation_count = citations.len(),
            source_count = sources_cited.len(),
            "synthesis completed"
        );

        Ok(SynthesizedAnswer {
            query: retrieval.query.clone(),
            response,
            citations,
            sources: sources_cited,
            footer,
            documents,
        })
    }

    /// Split retrieved chunks into numbered citation sources, in rank order.
    pub fn citation_sources(&self, retrieval: &RetrievalResult) -> Vec<CitationSource> {
        let mut sources = Vec::new();
        for result in &retrieval.results {
            let document_id = self
                .index_store
                .as_ref()
                .and_then(|store| store.resolve(&result.node.id).ok())
                .unwrap_or(result.node.document_id.as_str())
                .to_string();
            for text in split_text(
                &result.node.text,
                self.config.citation_chunk_size,
                self.config.citation_chunk_overlap,
            ) {
                sources.push(CitationSource {
                    number: sources.len() + 1,
                    chunk_id: result.node.id.clone(),
                    document_id: document_id.clone(),
                    text,
                    score: result.score,
                    metadata: result.node.metadata.clone(),
                });
            }
        }
        sources
    }

    fn group_documents(&self, sources: &[SourceRef]) -> Vec<DocumentGroup> {
        let groups = match &self.index_store {
            Some(store) => store.group_by_document(sources.iter().map(|s| s.chunk_id.as_str())),
            None => {
                let mut groups: Vec<(String, Vec<String>)> = Vec::new();
                for source in sources {
                    match groups.iter_mut().find(|(doc, _)| *doc == source.document_id) {
                        Some((_, chunks)) => chunks.push(source.chunk_id.clone()),
                        None => groups
                            .push((source.document_id.clone(), vec![source.chunk_id.clone()])),
                    }
                }
                groups
            }
        };
        groups
            .into_iter()
            .map(|(document_id, chunk_ids)| DocumentGroup { document_id, chunk_ids })
            .collect()
    }

    /// Metadata values of the top retrieved chunks that carry the footer key.
    fn footer(&self, retrieval: &RetrievalResult) -> Vec<String> {
        let key = &self.config.source_metadata_key;
        let mut footer: Vec<String> = Vec::new();
        for result in retrieval.results.iter().take(self.config.footer_sources) {
            match result.node.attribute(key) {
                Some(value) if !footer.iter().any(|v| v == value) => footer.push(value.to_string()),
                Some(_) => {}
                None => {
                    debug!(chunk_id = %result.node.id, key = %key, "chunk lacks footer metadata")
                }
            }
        }
        footer
    }
}

fn render_context(sources: &[CitationSource]) -> String {
    sources
        .iter()
        .map(|s| format!("Source {}:\n{}", s.number, s.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Rewrite citation markers so they only name existing sources.
///
/// Out-of-range numbers are dropped from their marker; a marker left empty
/// is removed along with one preceding space. Returns the rewritten text and
/// one [`Citation`] per valid number, with byte spans into the new text.
fn resolve_citations(
    marker: &Regex,
    text: &str,
    sources: &[CitationSource],
) -> (String, Vec<Citation>) {
    let mut output = String::with_capacity(text.len());
    let mut citations = Vec::new();
    let mut last = 0;

    for captures in marker.captures_iter(text) {
        let (Some(whole), Some(numbers)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        output.push_str(&text[last..whole.start()]);
        last = whole.end();

        let mut valid: Vec<usize> = Vec::new();
        for raw in numbers.as_str().split(',') {
            match raw.trim().parse::<usize>() {
                Ok(n) if (1..=sources.len()).contains(&n) => {
                    if !valid.contains(&n) {
                        valid.push(n);
                    }
                }
                _ => warn!(
                    marker = whole.as_str(),
                    source = raw.trim(),
                    "dropping citation of unknown source"
                ),
            }
        }

        if valid.is_empty() {
            if output.ends_with(' ') {
                output.pop();
            }
            continue;
        }

        let rewritten = format!(
            "[{}]",
            valid.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
        );
        let start = output.len();
        output.push_str(&rewritten);
        let end = output.len();
        for n in valid {
            citations.push(Citation {
                source: n,
                chunk_id: sources[n - 1].chunk_id.clone(),
                start,
                end,
            });
        }
    }
    output.push_str(&text[last..]);

    (output, citations)
}

/// Unique cited chunks in order of first citation.
fn cited_sources(citations: &[Citation], sources: &[CitationSource]) -> Vec<SourceRef> {
    let mut cited: Vec<SourceRef> = Vec::new();
    for citation in citations {
        if cited.iter().any(|s| s.chunk_id == citation.chunk_id) {
            continue;
        }
        let source = &sources[citation.source - 1];
        cited.push(SourceRef {
            chunk_id: source.chunk_id.clone(),
            document_id: source.document_id.clone(),
            metadata: source.metadata.clone(),
        });
    }
    cited
}
