//! Core data models used throughout askdocs.
//!
//! These types represent the documents, chunks, and query records that flow
//! through the ingestion and query pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// A stored file's metadata record.
///
/// Identifiers are assigned by the store, monotonically increasing, and
/// never reused even after deletion. `upload_date` is assigned at creation
/// time, never user-supplied.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub metadata: Value,
}

/// One text block produced by a loader, before normalization and chunking.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// A chunk ready for storage. Its index is assigned by position in the
/// batch handed to [`DocumentStore::store_chunks`](crate::store::DocumentStore::store_chunks).
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub text: String,
    pub metadata: Map<String, Value>,
    pub embedding: Option<Vec<f32>>,
}

/// A stored chunk row.
///
/// Invariant: for any document, the set of `chunk_index` values is exactly
/// `0..n-1` with no gaps, in the order the chunker produced them.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    pub id: i64,
    pub document_id: i64,
    pub text: String,
    pub chunk_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: Value,
}

/// An audit-log entry for one query-service invocation. Append-only;
/// `document_id` is `None` for queries over all documents.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub query_text: String,
    pub document_id: Option<i64>,
    pub result_text: String,
    pub query_date: DateTime<Utc>,
}
