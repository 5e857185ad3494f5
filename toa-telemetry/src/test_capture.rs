use tracing::Level;

use crate::memory::SharedEventStorage;

#[test]
fn test_captures_message_and_fields() {
    let storage = SharedEventStorage::new();
    let _guard = tracing::subscriber::set_default(crate::capture_subscriber(storage.clone()));

    let chunk_id = "case-17_3";
    tracing::warn!(chunk_id = %chunk_id, skipped = 2u64, "vector match has no stored text");
    tracing::info!(result_count = 5u64, "retrieval completed");

    let events = storage.events();
    assert_eq!(events.len(), 2);

    let warning = &storage.find(Level::WARN, "no stored text")[0];
    assert_eq!(warning.field("chunk_id").as_deref(), Some("case-17_3"));
    assert_eq!(warning.field("skipped").as_deref(), Some("2"));
    assert!(warning.timestamp > 0);

    assert_eq!(events[1].level, "INFO");
    assert_eq!(events[1].message, "retrieval completed");
}

#[test]
fn test_storage_is_scoped_to_default_subscriber() {
    let storage = SharedEventStorage::new();
    {
        let _guard = tracing::subscriber::set_default(crate::capture_subscriber(storage.clone()));
        tracing::error!("inside");
    }
    tracing::error!("outside");

    let events = storage.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, "inside");

    storage.clear();
    assert!(storage.events().is_empty());
}

#[test]
fn test_events_serialize_to_json() {
    let storage = SharedEventStorage::new();
    let _guard = tracing::subscriber::set_default(crate::capture_subscriber(storage.clone()));
    tracing::debug!(top_k = 20u64, "vector search returned");

    let json = serde_json::to_value(&storage.events()[0]).unwrap();
    assert_eq!(json["level"], "DEBUG");
    assert_eq!(json["fields"]["top_k"], 20);
}
