//! Shared fixtures: a small corpus of case summaries indexed with hashed embeddings.
#![allow(dead_code)]

use std::sync::Arc;

use toa_rag::{
    Document, EmbeddingProvider, EngineConfig, EngineConfigBuilder, HashEmbeddingProvider,
    IndexBuilder, Metadata, RecursiveChunker, StorageContext,
};

pub const DIMENSIONS: usize = 4096;

pub fn embedder() -> Arc<HashEmbeddingProvider> {
    Arc::new(HashEmbeddingProvider::new(DIMENSIONS))
}

/// Engine settings naming the fixture embedder's model.
pub fn config() -> EngineConfigBuilder {
    EngineConfig::builder().embedding_model(embedder().model())
}

fn case(id: &str, case_number: Option<&str>, text: &str) -> Document {
    let mut metadata = Metadata::new();
    if let Some(number) = case_number {
        metadata.insert("case_number".to_string(), number.to_string());
    }
    metadata.insert("court".to_string(), "Supreme Court of India".to_string());
    Document { id: id.to_string(), text: text.to_string(), metadata }
}

/// Four single-chunk cases; `case-004` carries no case number.
pub fn cases() -> Vec<Document> {
    vec![
        case(
            "case-001",
            Some("CA 1123/2009"),
            "The insurer repudiated the marine insurance claim after the vessel sank. \
             Repudiation without a survey report was held arbitrary and compensation was awarded.",
        ),
        case(
            "case-002",
            Some("CA 2210/2015"),
            "A motor accident claim was contested by the insurance company because the driver \
             lacked a valid licence. The tribunal fixed liability on the insurer.",
        ),
        case(
            "case-003",
            Some("SLP 4471/2018"),
            "Eviction of a tenant under the Rent Control Act was upheld because the landlord \
             proved bona fide requirement for personal residence.",
        ),
        case(
            "case-004",
            None,
            "Anticipatory bail was granted under section 438 where the accused cooperated with \
             the investigation and custodial interrogation was unnecessary.",
        ),
    ]
}

/// Build an in-memory storage context over [`cases`].
pub async fn storage() -> StorageContext {
    IndexBuilder::builder()
        .embedding_provider(embedder())
        .chunker(Arc::new(RecursiveChunker::new(1000, 50)))
        .index_id("supreme-court")
        .build()
        .unwrap()
        .build(&cases())
        .await
        .unwrap()
}

/// A relevant query for `case-001`.
pub const MARINE_QUERY: &str = "marine insurance claim repudiated";

/// A query sharing no vocabulary with the corpus.
pub const UNRELATED_QUERY: &str = "xylophone quartz zebra";
