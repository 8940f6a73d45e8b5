//! Contract tests for the document store, run against the in-memory
//! backend (the Postgres backend satisfies the same contract through the
//! shared trait; exercising it needs a live database).

use serde_json::{json, Map};

use askdocs::error::Error;
use askdocs::models::NewChunk;
use askdocs::store::memory::MemoryStore;
use askdocs::store::DocumentStore;

fn chunk(text: &str) -> NewChunk {
    NewChunk {
        text: text.to_string(),
        metadata: Map::new(),
        embedding: None,
    }
}

async fn create(store: &MemoryStore, filename: &str) -> i64 {
    store
        .create_document(filename, "text/plain", 1, &Map::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn identifiers_are_distinct_and_monotonically_increasing() {
    let store = MemoryStore::new();
    let first = create(&store, "a.txt").await;
    let second = create(&store, "b.txt").await;
    let third = create(&store, "c.txt").await;
    assert!(first < second && second < third);
}

#[tokio::test]
async fn identifiers_are_not_reused_after_deletion() {
    let store = MemoryStore::new();
    let first = create(&store, "a.txt").await;
    store.delete_document(first).await.unwrap();
    let second = create(&store, "b.txt").await;
    assert!(second > first);
}

#[tokio::test]
async fn chunks_come_back_in_index_order() {
    let store = MemoryStore::new();
    let id = create(&store, "a.txt").await;
    let chunks: Vec<NewChunk> = (0..5).map(|i| chunk(&format!("part {}", i))).collect();
    store.store_chunks(id, &chunks).await.unwrap();

    let stored = store.get_chunks(id).await.unwrap();
    assert_eq!(stored.len(), 5);
    for (i, c) in stored.iter().enumerate() {
        assert_eq!(c.chunk_index, i as i64);
        assert_eq!(c.document_id, id);
        assert_eq!(c.text, format!("part {}", i));
    }
}

#[tokio::test]
async fn delete_cascades_to_chunks() {
    let store = MemoryStore::new();
    let id = create(&store, "a.txt").await;
    store
        .store_chunks(id, &[chunk("one"), chunk("two")])
        .await
        .unwrap();

    store.delete_document(id).await.unwrap();

    assert!(store.get_document(id).await.unwrap().is_none());
    assert!(store.get_chunks(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn second_delete_reports_not_found() {
    let store = MemoryStore::new();
    let id = create(&store, "a.txt").await;
    store.delete_document(id).await.unwrap();

    let err = store.delete_document(id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn delete_leaves_other_documents_alone() {
    let store = MemoryStore::new();
    let keep = create(&store, "keep.txt").await;
    let removed = create(&store, "drop.txt").await;
    store.store_chunks(keep, &[chunk("kept")]).await.unwrap();
    store
        .store_chunks(removed, &[chunk("dropped")])
        .await
        .unwrap();

    store.delete_document(removed).await.unwrap();

    assert!(store.get_document(keep).await.unwrap().is_some());
    assert_eq!(store.get_chunks(keep).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_orders_newest_first() {
    let store = MemoryStore::new();
    let first = create(&store, "first.txt").await;
    let second = create(&store, "second.txt").await;
    let third = create(&store, "third.txt").await;

    let listed = store.list_documents().await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
async fn storing_chunks_for_missing_document_fails() {
    let store = MemoryStore::new();
    let err = store.store_chunks(42, &[chunk("orphan")]).await.unwrap_err();
    assert!(matches!(err, Error::StorageFailure(_)));
}

#[tokio::test]
async fn document_metadata_round_trips() {
    let store = MemoryStore::new();
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), json!("upload"));
    metadata.insert("type".to_string(), json!("Text file"));

    let id = store
        .create_document("a.txt", "text/plain", 9, &metadata)
        .await
        .unwrap();
    let doc = store.get_document(id).await.unwrap().unwrap();
    assert_eq!(doc.metadata["source"], json!("upload"));
    assert_eq!(doc.metadata["type"], json!("Text file"));
}

#[tokio::test]
async fn chunk_embeddings_round_trip() {
    let store = MemoryStore::new();
    let id = create(&store, "a.txt").await;
    let mut with_vector = chunk("embedded");
    with_vector.embedding = Some(vec![0.25, -0.5, 1.0]);
    store
        .store_chunks(id, &[with_vector, chunk("plain")])
        .await
        .unwrap();

    let stored = store.get_chunks(id).await.unwrap();
    assert_eq!(stored[0].embedding.as_deref(), Some([0.25, -0.5, 1.0].as_slice()));
    assert!(stored[1].embedding.is_none());
}

#[tokio::test]
async fn query_log_is_append_only() {
    let store = MemoryStore::new();
    let id = create(&store, "a.txt").await;
    store
        .record_query("first?", Some(id), "answer one")
        .await
        .unwrap();
    store.record_query("second?", None, "answer two").await.unwrap();

    let log = store.recorded_queries();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].query_text, "first?");
    assert_eq!(log[0].document_id, Some(id));
    assert_eq!(log[1].document_id, None);
}
