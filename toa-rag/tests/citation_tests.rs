//! Citation-aware answers: every citation points into the retrieval it came from.

mod common;

use std::sync::Arc;

use toa_rag::prompts::NO_SOURCES_RESPONSE;
use toa_rag::{CitationQueryEngine, EngineConfig, MockGenerator, RagError};
use toa_telemetry::SharedEventStorage;
use tracing::Level;

async fn engine(generator: Arc<MockGenerator>, config: EngineConfig) -> CitationQueryEngine {
    let storage = common::storage().await;
    CitationQueryEngine::from_storage(&storage, common::embedder(), generator, config).unwrap()
}

fn top_two() -> EngineConfig {
    common::config().top_k(2).build().unwrap()
}

#[tokio::test]
async fn blank_query_is_invalid_and_never_cached() {
    let generator = Arc::new(MockGenerator::replying("Held arbitrary [1]."));
    let engine = engine(Arc::clone(&generator), top_two()).await;

    for query in ["", "   "] {
        let err = engine.query(query).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidQuery(_)), "query {query:?}");
    }
    assert!(generator.calls().is_empty());
    assert_eq!(engine.cached_answers().await, 0);

    engine.query(common::MARINE_QUERY).await.unwrap();
    assert_eq!(engine.cached_answers().await, 1);
}

#[tokio::test]
async fn citations_only_reference_retrieved_chunks() {
    let generator = Arc::new(MockGenerator::replying(
        "Repudiation without a survey was arbitrary [1]. Compensation followed [1, 7]. \
         Licence defects shift liability [2]. See also [9].",
    ));
    let engine = engine(Arc::clone(&generator), top_two()).await;

    let events = SharedEventStorage::new();
    let _guard =
        tracing::subscriber::set_default(toa_telemetry::capture_subscriber(events.clone()));

    let answer = engine.query(common::MARINE_QUERY).await.unwrap();
    let retrieval = engine.retriever().retrieve(common::MARINE_QUERY).await.unwrap();

    assert_eq!(
        answer.response,
        "Repudiation without a survey was arbitrary [1]. Compensation followed [1]. \
         Licence defects shift liability [2]. See also."
    );
    assert_eq!(answer.citations.len(), 3);
    for citation in &answer.citations {
        assert!(retrieval.contains(&citation.chunk_id), "{} not retrieved", citation.chunk_id);
        let marker = &answer.response[citation.start..citation.end];
        assert!(marker.contains(&citation.source.to_string()), "marker {marker}");
    }
    assert_eq!(answer.source_ids(), retrieval.chunk_ids());

    let dropped = events.find(Level::WARN, "dropping citation of unknown source");
    assert_eq!(dropped.len(), 2);
}

#[tokio::test]
async fn sources_are_numbered_in_the_generator_context() {
    let generator = Arc::new(MockGenerator::replying("Held arbitrary [1]."));
    let engine = engine(Arc::clone(&generator), top_two()).await;
    engine.query(common::MARINE_QUERY).await.unwrap();

    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].context.starts_with("Source 1:\nThe insurer repudiated"));
    assert!(calls[0].context.contains("\n\nSource 2:\n"));
    assert!(!calls[0].context.contains("Source 3:"));
    assert!(calls[0].prompt.contains(common::MARINE_QUERY));
}

#[tokio::test]
async fn long_chunks_are_split_into_several_sources() {
    let generator = Arc::new(MockGenerator::replying("Held arbitrary [3]."));
    let config = common::config().top_k(1).citation_chunking(60, 10).build().unwrap();
    let engine = engine(Arc::clone(&generator), config).await;

    let answer = engine.query(common::MARINE_QUERY).await.unwrap();
    let context = &generator.calls()[0].context;
    assert!(context.contains("Source 3:"));

    // Every source cut from the same chunk cites back to that chunk.
    assert_eq!(answer.citations[0].source, 3);
    assert_eq!(answer.citations[0].chunk_id, "case-001_0");
    assert_eq!(answer.documents.len(), 1);
    assert_eq!(answer.documents[0].document_id, "case-001");
}

#[tokio::test]
async fn empty_retrieval_skips_the_generator() {
    let generator = Arc::new(MockGenerator::replying("should not be used [1]"));
    let config = common::config().similarity_threshold(0.2).build().unwrap();
    let engine = engine(Arc::clone(&generator), config).await;

    let answer = engine.query(common::UNRELATED_QUERY).await.unwrap();
    assert_eq!(answer.response, NO_SOURCES_RESPONSE);
    assert!(answer.citations.is_empty());
    assert!(!answer.has_sources());
    assert!(answer.footer.is_empty());
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn generator_failure_is_synthesis_failed() {
    let engine = engine(Arc::new(MockGenerator::failing("rate limited")), top_two()).await;
    let err = engine.query(common::MARINE_QUERY).await.unwrap_err();
    assert!(matches!(err, RagError::SynthesisFailed(msg) if msg.contains("rate limited")));
}

#[tokio::test]
async fn foreign_generator_errors_become_synthesis_failed() {
    let generator = Arc::new(MockGenerator::new(|_, _| {
        Err(RagError::EmbeddingError { provider: "remote".into(), message: "timeout".into() })
    }));
    let engine = engine(generator, top_two()).await;
    let err = engine.query(common::MARINE_QUERY).await.unwrap_err();
    assert!(matches!(err, RagError::SynthesisFailed(msg) if msg.contains("timeout")));
}

#[tokio::test]
async fn blank_generation_is_synthesis_failed() {
    let engine = engine(Arc::new(MockGenerator::replying("  \n ")), top_two()).await;
    let err = engine.query(common::MARINE_QUERY).await.unwrap_err();
    assert!(matches!(err, RagError::SynthesisFailed(_)));
}

#[tokio::test]
async fn answer_without_citations_is_logged() {
    let generator = Arc::new(MockGenerator::replying("Nothing to cite here."));
    let engine = engine(generator, top_two()).await;

    let events = SharedEventStorage::new();
    let _guard =
        tracing::subscriber::set_default(toa_telemetry::capture_subscriber(events.clone()));

    let answer = engine.query(common::MARINE_QUERY).await.unwrap();
    assert!(answer.citations.is_empty());
    assert!(!answer.has_sources());
    assert_eq!(events.find(Level::WARN, "answer cites no sources").len(), 1);
}

#[tokio::test]
async fn footer_lists_case_numbers_of_top_results() {
    let engine = engine(Arc::new(MockGenerator::replying("Held arbitrary [1].")), top_two()).await;
    let answer = engine.query(common::MARINE_QUERY).await.unwrap();

    assert_eq!(answer.footer, ["CA 1123/2009", "CA 2210/2015"]);
    assert!(answer.render().ends_with("\n\nSources: CA 1123/2009 & CA 2210/2015"));
    assert_eq!(answer.to_string(), answer.render());
}

#[tokio::test]
async fn footer_skips_results_without_case_number() {
    let engine = engine(Arc::new(MockGenerator::replying("Bail granted [1].")), top_two()).await;
    let answer =
        engine.query("anticipatory bail section 438 custodial interrogation").await.unwrap();

    assert_eq!(answer.source_ids(), ["case-004_0"]);
    assert_eq!(answer.footer.len(), 1);
    assert!(answer.footer.iter().all(|number| !number.is_empty()));
}

#[tokio::test]
async fn repeated_queries_are_served_from_cache() {
    let generator = Arc::new(MockGenerator::replying("Held arbitrary [1]."));
    let engine = engine(Arc::clone(&generator), top_two()).await;

    let first = engine.query(common::MARINE_QUERY).await.unwrap();
    let second = engine.query(&format!("  {}  ", common::MARINE_QUERY)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(generator.calls().len(), 1);
}

#[tokio::test]
async fn zero_capacity_disables_the_cache() {
    let generator = Arc::new(MockGenerator::replying("Held arbitrary [1]."));
    let config = common::config().top_k(2).cache_capacity(0).build().unwrap();
    let engine = engine(Arc::clone(&generator), config).await;

    engine.query(common::MARINE_QUERY).await.unwrap();
    engine.query(common::MARINE_QUERY).await.unwrap();
    assert_eq!(generator.calls().len(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let generator = Arc::new(MockGenerator::replying(""));
    let engine = engine(Arc::clone(&generator), top_two()).await;

    assert!(engine.query(common::MARINE_QUERY).await.is_err());
    assert!(engine.query(common::MARINE_QUERY).await.is_err());
    assert_eq!(generator.calls().len(), 2);
}
