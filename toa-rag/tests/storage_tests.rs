//! Persist/load round trips and load-time validation of the storage directory.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use toa_rag::{
    CitationQueryEngine, DOCSTORE_FILE, HashEmbeddingProvider, INDEX_STORE_FILE, MockGenerator,
    RagError, Retriever, StorageContext, VECTOR_STORE_FILE,
};

async fn persisted() -> TempDir {
    let dir = TempDir::new().unwrap();
    common::storage().await.persist(dir.path()).unwrap();
    dir
}

fn edit_json(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    edit(&mut value);
    fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
}

#[tokio::test]
async fn persisted_index_loads_and_retrieves_identically() {
    let built = common::storage().await;
    let dir = persisted().await;
    for file in [VECTOR_STORE_FILE, DOCSTORE_FILE, INDEX_STORE_FILE] {
        assert!(dir.path().join(file).is_file(), "{file} not written");
    }

    let loaded = StorageContext::load(dir.path()).unwrap();
    assert_eq!(loaded.chunk_count(), built.chunk_count());
    assert_eq!(loaded.index_store().index_id(), "supreme-court");
    assert_eq!(loaded.index_store().document_count(), 4);

    let config = common::config().top_k(3).build().unwrap();
    let from_built = Retriever::from_storage(&built, common::embedder(), &config).unwrap();
    let from_loaded = Retriever::from_storage(&loaded, common::embedder(), &config).unwrap();
    assert_eq!(
        from_built.retrieve(common::MARINE_QUERY).await.unwrap(),
        from_loaded.retrieve(common::MARINE_QUERY).await.unwrap()
    );
}

#[test]
fn missing_directory_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = StorageContext::load(&dir.path().join("storage")).unwrap_err();
    assert!(matches!(err, RagError::IndexUnavailable { .. }));
}

#[tokio::test]
async fn missing_artifact_is_unavailable() {
    let dir = persisted().await;
    fs::remove_file(dir.path().join(DOCSTORE_FILE)).unwrap();
    let err = StorageContext::load(dir.path()).unwrap_err();
    assert!(
        matches!(err, RagError::IndexUnavailable { path, .. } if path.ends_with(DOCSTORE_FILE))
    );
}

#[tokio::test]
async fn malformed_artifact_is_corrupt() {
    let dir = persisted().await;
    fs::write(dir.path().join(VECTOR_STORE_FILE), "{ not json").unwrap();
    let err = StorageContext::load(dir.path()).unwrap_err();
    assert!(matches!(err, RagError::CorruptStore(_)));
}

#[tokio::test]
async fn orphan_vector_entry_is_corrupt() {
    let dir = persisted().await;
    edit_json(&dir.path().join(VECTOR_STORE_FILE), |value| {
        let entries = value["entries"].as_array_mut().unwrap();
        entries.push(serde_json::json!({
            "id": "c42",
            "embedding": vec![0.0f32; common::DIMENSIONS],
        }));
    });

    let err = StorageContext::load(dir.path()).unwrap_err();
    match err {
        RagError::CorruptStore(message) => {
            assert!(message.contains("'c42'"), "unexpected message: {message}");
            assert!(message.contains("missing from the document store"));
        }
        other => panic!("expected CorruptStore, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_embedding_length_is_corrupt() {
    let dir = persisted().await;
    edit_json(&dir.path().join(VECTOR_STORE_FILE), |value| {
        value["entries"][0]["embedding"] = serde_json::json!([0.5, 0.5]);
    });
    let err = StorageContext::load(dir.path()).unwrap_err();
    assert!(matches!(err, RagError::CorruptStore(msg) if msg.contains("dimensions")));
}

#[tokio::test]
async fn docstore_key_must_match_node_id() {
    let dir = persisted().await;
    edit_json(&dir.path().join(DOCSTORE_FILE), |value| {
        value["nodes"]["case-001_0"]["id"] = serde_json::json!("case-999_0");
    });
    let err = StorageContext::load(dir.path()).unwrap_err();
    assert!(matches!(err, RagError::CorruptStore(_)));
}

#[tokio::test]
async fn different_embedding_model_is_a_config_mismatch() {
    let dir = persisted().await;
    let storage = StorageContext::load(dir.path()).unwrap();
    let other = Arc::new(HashEmbeddingProvider::new(512));
    let config = common::config().embedding_model("hash-512").build().unwrap();
    let err = Retriever::from_storage(&storage, other, &config).err().unwrap();
    match err {
        RagError::ConfigMismatch { field, expected, found } => {
            assert_eq!(field, "embedding_model");
            assert_eq!(expected, "hash-512");
            assert_eq!(found, format!("hash-{}", common::DIMENSIONS));
        }
        other => panic!("expected ConfigMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn configured_model_must_match_the_persisted_index() {
    let dir = persisted().await;
    let storage = StorageContext::load(dir.path()).unwrap();
    let config = common::config().embedding_model("text-embedding-3-large").build().unwrap();

    let err = Retriever::from_storage(&storage, common::embedder(), &config).err().unwrap();
    match err {
        RagError::ConfigMismatch { field, expected, found } => {
            assert_eq!(field, "embedding_model");
            assert_eq!(expected, "text-embedding-3-large");
            assert_eq!(found, format!("hash-{}", common::DIMENSIONS));
        }
        other => panic!("expected ConfigMismatch, got {other:?}"),
    }

    let engine = CitationQueryEngine::from_storage(
        &storage,
        common::embedder(),
        Arc::new(MockGenerator::replying("unused")),
        config,
    );
    assert!(matches!(engine.err().unwrap(), RagError::ConfigMismatch { .. }));
}

#[tokio::test]
async fn provider_must_serve_the_configured_model() {
    let storage = common::storage().await;
    let provider = HashEmbeddingProvider::new(common::DIMENSIONS).with_model("hash-legacy");
    let config = common::config().build().unwrap();

    let err = Retriever::from_storage(&storage, Arc::new(provider), &config).err().unwrap();
    match err {
        RagError::ConfigMismatch { field, expected, found } => {
            assert_eq!(field, "embedding_model");
            assert_eq!(expected, format!("hash-{}", common::DIMENSIONS));
            assert_eq!(found, "hash-legacy");
        }
        other => panic!("expected ConfigMismatch, got {other:?}"),
    }
}
