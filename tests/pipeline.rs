//! End-to-end ingestion tests: real files on disk, through the loader,
//! chunker, and normalizer, into the in-memory store.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use askdocs::chunk::{CHUNK_OVERLAP, CHUNK_SIZE};
use askdocs::error::Error;
use askdocs::ingest::ingest_file;
use askdocs::store::memory::MemoryStore;
use askdocs::store::DocumentStore;

fn fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// 1500 characters that do not repeat every 200, so overlap checks are
/// meaningful.
fn long_text(len: usize) -> String {
    (0..len)
        .map(|i| char::from(b'a' + (i % 23) as u8))
        .collect()
}

async fn ingest(store: &MemoryStore, path: &PathBuf) -> Result<i64, Error> {
    let filename = path.file_name().unwrap().to_str().unwrap();
    let size = fs::metadata(path).unwrap().len() as i64;
    ingest_file(store, None, path, filename, "text/plain", size).await
}

#[tokio::test]
async fn ingest_stores_document_and_chunks() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(&dir, "notes.txt", b"a short note about nothing in particular");

    let id = ingest(&store, &path).await.unwrap();

    let doc = store.get_document(id).await.unwrap().unwrap();
    assert_eq!(doc.filename, "notes.txt");
    assert_eq!(doc.file_type, "text/plain");
    assert_eq!(doc.file_size, 40);
    assert_eq!(doc.metadata["source"], serde_json::json!("upload"));
    assert_eq!(doc.metadata["type"], serde_json::json!("Text file"));

    let chunks = store.get_chunks(id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].text, "a short note about nothing in particular");
}

#[tokio::test]
async fn fifteen_hundred_char_document_yields_two_overlapping_chunks() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(&dir, "long.txt", long_text(1500).as_bytes());

    let id = ingest(&store, &path).await.unwrap();
    let chunks = store.get_chunks(id).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text.chars().count(), CHUNK_SIZE);
    // The second window starts CHUNK_OVERLAP before the first one's end and
    // runs to the end of the block: 1500 - 800 = 700 characters.
    assert_eq!(chunks[1].text.chars().count(), 700);

    let tail: String = chunks[0]
        .text
        .chars()
        .skip(CHUNK_SIZE - CHUNK_OVERLAP)
        .collect();
    let head: String = chunks[1].text.chars().take(CHUNK_OVERLAP).collect();
    assert_eq!(tail, head);
}

#[tokio::test]
async fn chunk_indices_are_contiguous_from_zero() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(&dir, "big.txt", long_text(5200).as_bytes());

    let id = ingest(&store, &path).await.unwrap();
    let chunks = store.get_chunks(id).await.unwrap();

    assert!(chunks.len() > 2);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i as i64);
        assert!(!chunk.text.is_empty());
        assert!(chunk.text.chars().count() <= CHUNK_SIZE);
    }
}

#[tokio::test]
async fn empty_file_is_rejected_without_writes() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(&dir, "empty.txt", b"");

    let err = ingest(&store, &path).await.unwrap_err();
    assert!(matches!(err, Error::EmptyDocument));
    assert!(store.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn whitespace_only_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(&dir, "blank.txt", b"  \n\t  \n");

    let err = ingest(&store, &path).await.unwrap_err();
    assert!(matches!(err, Error::EmptyDocument));
}

#[tokio::test]
async fn unsupported_binary_is_rejected_without_writes() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(&dir, "image.bin", &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x92]);

    let err = ingest(&store, &path).await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(ext) if ext == "bin"));
    assert!(store.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn csv_rows_become_blocks_with_normalized_metadata() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let path = fixture(
        &dir,
        "people.csv",
        b"name,role\nalice,engineer\nbob,designer\n",
    );

    let id = ingest(&store, &path).await.unwrap();
    let chunks = store.get_chunks(id).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "name: alice\nrole: engineer");
    // Block metadata survives normalization and lands on the chunk.
    assert_eq!(chunks[0].metadata["row"], serde_json::json!(0));
    assert_eq!(chunks[1].metadata["row"], serde_json::json!(1));
    assert_eq!(chunks[0].metadata["file_name"], serde_json::json!("people.csv"));
}

#[tokio::test]
async fn multi_block_document_keeps_block_order() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    // Two CSV rows, the first long enough to span two windows.
    let long_field = long_text(1200);
    let body = format!("content\n{}\nsecond row\n", long_field);
    let path = fixture(&dir, "rows.csv", body.as_bytes());

    let id = ingest(&store, &path).await.unwrap();
    let chunks = store.get_chunks(id).await.unwrap();

    assert_eq!(chunks.len(), 3);
    assert!(chunks[2].text.contains("second row"));
    // Windows never span block boundaries.
    assert!(!chunks[1].text.contains("second row"));
}
