//! Storage abstraction for documents, chunks, and the query log.
//!
//! The [`DocumentStore`] trait defines every storage operation the
//! ingestion pipeline and query service need, with two interchangeable
//! implementations selected once at startup:
//!
//! - [`postgres::PostgresStore`] when database credentials are configured
//! - [`memory::MemoryStore`] otherwise (development and tests)
//!
//! Both satisfy the same externally observable contract. All operations
//! report failure as an [`Error`](crate::error::Error) value; nothing
//! panics across this boundary and no operation partially applies when it
//! cannot reach the backend.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create_document`](DocumentStore::create_document) | Insert a document record, returning a fresh id |
//! | [`store_chunks`](DocumentStore::store_chunks) | Append a document's chunks with indices `0..n-1` |
//! | [`get_document`](DocumentStore::get_document) | Retrieve one document by id |
//! | [`get_chunks`](DocumentStore::get_chunks) | Retrieve a document's chunks by ascending index |
//! | [`list_documents`](DocumentStore::list_documents) | All documents, newest upload first |
//! | [`delete_document`](DocumentStore::delete_document) | Remove a document and, with it, all of its chunks |
//! | [`record_query`](DocumentStore::record_query) | Append to the query audit log |

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::models::{ChunkRecord, Document, NewChunk};

/// Abstract storage backend.
///
/// Document identifiers are assigned on creation, monotonically increasing,
/// and never reused even after deletion.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document record and return its fresh identifier.
    async fn create_document(
        &self,
        filename: &str,
        file_type: &str,
        file_size: i64,
        metadata: &Map<String, Value>,
    ) -> Result<i64>;

    /// Append chunks for a document with indices `0..chunks.len()-1`.
    ///
    /// Calling this twice for the same document is not deduplicated; the
    /// ingestion pipeline calls it at most once per document.
    async fn store_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<()>;

    /// Retrieve one document by id.
    async fn get_document(&self, id: i64) -> Result<Option<Document>>;

    /// Retrieve a document's chunks ordered by ascending chunk index.
    async fn get_chunks(&self, document_id: i64) -> Result<Vec<ChunkRecord>>;

    /// All documents, ordered by upload time descending.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Remove a document and all of its chunks. A second call for the same
    /// id returns [`Error::NotFound`](crate::error::Error::NotFound).
    async fn delete_document(&self, id: i64) -> Result<()>;

    /// Append a query and its answer to the audit log. `document_id` is
    /// `None` for queries over all documents.
    async fn record_query(
        &self,
        query_text: &str,
        document_id: Option<i64>,
        result_text: &str,
    ) -> Result<()>;
}

/// Construct the store selected by configuration.
///
/// With database credentials configured this connects a
/// [`postgres::PostgresStore`]; otherwise it returns a fresh
/// [`memory::MemoryStore`] and logs which mode is active.
pub async fn create_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    if config.db.is_configured() {
        let pool = db::connect(&config.db).await?;
        tracing::info!(host = ?config.db.host, "using Postgres document store");
        Ok(Arc::new(postgres::PostgresStore::new(pool)))
    } else {
        tracing::info!("no database configured, using in-memory document store");
        Ok(Arc::new(memory::MemoryStore::new()))
    }
}
