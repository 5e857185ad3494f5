//! Retriever behaviour over a hashed-embedding index.

mod common;

use std::sync::Arc;

use toa_rag::{DocumentStore, EngineConfig, RagError, Retriever};
use toa_telemetry::SharedEventStorage;
use tracing::Level;

async fn retriever(config: &EngineConfig) -> Retriever {
    Retriever::from_storage(&common::storage().await, common::embedder(), config).unwrap()
}

#[tokio::test]
async fn blank_query_is_invalid() {
    let retriever = retriever(&common::config().build().unwrap()).await;
    for query in ["", "   ", "\n\t"] {
        let err = retriever.retrieve(query).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidQuery(_)), "query {query:?}");
    }
}

#[tokio::test]
async fn zero_top_k_is_invalid() {
    let retriever = retriever(&common::config().build().unwrap()).await;
    let err = retriever.retrieve_with_top_k(common::MARINE_QUERY, 0).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidQuery(_)));
}

#[tokio::test]
async fn results_are_ranked_and_bounded() {
    let config = common::config().top_k(3).build().unwrap();
    let retriever = retriever(&config).await;
    let result = retriever.retrieve(common::MARINE_QUERY).await.unwrap();

    assert_eq!(result.query, common::MARINE_QUERY);
    assert_eq!(result.len(), 3);
    assert_eq!(result.results[0].node.id, "case-001_0");
    assert_eq!(result.results[0].node.attribute("case_number"), Some("CA 1123/2009"));
    for window in result.results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
}

#[tokio::test]
async fn top_k_larger_than_corpus_returns_everything() {
    let retriever = retriever(&common::config().build().unwrap()).await;
    let result = retriever.retrieve_with_top_k(common::MARINE_QUERY, 50).await.unwrap();
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn unrelated_query_below_threshold_is_empty() {
    let config = common::config().similarity_threshold(0.2).build().unwrap();
    let retriever = retriever(&config).await;

    let result = retriever.retrieve(common::UNRELATED_QUERY).await.unwrap();
    assert!(result.is_empty());

    let relevant = retriever.retrieve(common::MARINE_QUERY).await.unwrap();
    assert!(relevant.contains("case-001_0"));
}

#[tokio::test]
async fn chunk_missing_from_docstore_is_skipped_and_logged() {
    let storage = common::storage().await;
    let full = storage.docstore();
    let mut partial = DocumentStore::new();
    for id in full.chunk_ids().filter(|id| *id != "case-001_0") {
        partial.insert(full.get(id).unwrap().clone()).unwrap();
    }

    let retriever = Retriever::builder()
        .vector_index(storage.vector_index())
        .docstore(Arc::new(partial))
        .embedding_provider(common::embedder())
        .top_k(4)
        .build()
        .unwrap();

    let events = SharedEventStorage::new();
    let _guard =
        tracing::subscriber::set_default(toa_telemetry::capture_subscriber(events.clone()));

    let result = retriever.retrieve(common::MARINE_QUERY).await.unwrap();
    assert_eq!(result.len(), 3);
    assert!(!result.contains("case-001_0"));

    let warnings = events.find(Level::WARN, "no stored text");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("chunk_id").as_deref(), Some("case-001_0"));

    let completed = events.find(Level::INFO, "retrieval completed");
    assert_eq!(completed[0].field("skipped").as_deref(), Some("1"));
}

#[test]
fn builder_requires_every_collaborator() {
    let err = Retriever::builder().embedding_provider(common::embedder()).build().err().unwrap();
    assert!(matches!(err, RagError::ConfigError(msg) if msg.contains("vector_index")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_share_one_retriever() {
    let retriever = Arc::new(retriever(&common::config().build().unwrap()).await);
    let expected = retriever.retrieve(common::MARINE_QUERY).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let retriever = Arc::clone(&retriever);
            tokio::spawn(async move { retriever.retrieve(common::MARINE_QUERY).await.unwrap() })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), expected);
    }
}
