//! In-memory [`DocumentStore`] implementation for development and tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock` with atomic id counters. The
//! counters live for the process lifetime only: restarting the process
//! restarts identifier assignment. That is intentional for the substitute
//! mode, which exists so the system runs without credentials, and is why
//! the persistent backend must be configured for any real deployment.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{ChunkRecord, Document, NewChunk, QueryRecord};

use super::DocumentStore;

/// In-memory store holding documents, chunks, and the query log.
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
    chunks: RwLock<Vec<ChunkRecord>>,
    queries: RwLock<Vec<QueryRecord>>,
    next_document_id: AtomicI64,
    next_chunk_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            chunks: RwLock::new(Vec::new()),
            queries: RwLock::new(Vec::new()),
            next_document_id: AtomicI64::new(1),
            next_chunk_id: AtomicI64::new(1),
        }
    }

    /// Snapshot of the query audit log, oldest first. The persistent
    /// backend never reads its log back; this accessor exists so tests can
    /// verify that the query service records what it answered.
    pub fn recorded_queries(&self) -> Vec<QueryRecord> {
        self.queries.read().unwrap().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(
        &self,
        filename: &str,
        file_type: &str,
        file_size: i64,
        metadata: &Map<String, Value>,
    ) -> Result<i64> {
        let id = self.next_document_id.fetch_add(1, Ordering::SeqCst);
        let mut documents = self.documents.write().unwrap();
        documents.push(Document {
            id,
            filename: filename.to_string(),
            file_type: file_type.to_string(),
            file_size,
            upload_date: Utc::now(),
            metadata: Value::Object(metadata.clone()),
        });
        Ok(id)
    }

    async fn store_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<()> {
        {
            let documents = self.documents.read().unwrap();
            if !documents.iter().any(|d| d.id == document_id) {
                return Err(Error::StorageFailure(format!(
                    "document {} does not exist",
                    document_id
                )));
            }
        }
        let mut stored = self.chunks.write().unwrap();
        for (index, chunk) in chunks.iter().enumerate() {
            let id = self.next_chunk_id.fetch_add(1, Ordering::SeqCst);
            stored.push(ChunkRecord {
                id,
                document_id,
                text: chunk.text.clone(),
                chunk_index: index as i64,
                embedding: chunk.embedding.clone(),
                metadata: Value::Object(chunk.metadata.clone()),
            });
        }
        Ok(())
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let documents = self.documents.read().unwrap();
        Ok(documents.iter().find(|d| d.id == id).cloned())
    }

    async fn get_chunks(&self, document_id: i64) -> Result<Vec<ChunkRecord>> {
        let chunks = self.chunks.read().unwrap();
        let mut matching: Vec<ChunkRecord> = chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.chunk_index);
        Ok(matching)
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let documents = self.documents.read().unwrap();
        let mut all = documents.clone();
        all.sort_by(|a, b| {
            b.upload_date
                .cmp(&a.upload_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(all)
    }

    async fn delete_document(&self, id: i64) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        let before = documents.len();
        documents.retain(|d| d.id != id);
        if documents.len() == before {
            return Err(Error::NotFound(format!("document {}", id)));
        }
        let mut chunks = self.chunks.write().unwrap();
        chunks.retain(|c| c.document_id != id);
        Ok(())
    }

    async fn record_query(
        &self,
        query_text: &str,
        document_id: Option<i64>,
        result_text: &str,
    ) -> Result<()> {
        let mut queries = self.queries.write().unwrap();
        queries.push(QueryRecord {
            query_text: query_text.to_string(),
            document_id,
            result_text: result_text.to_string(),
            query_date: Utc::now(),
        });
        Ok(())
    }
}
