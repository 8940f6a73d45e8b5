//! Postgres-backed [`DocumentStore`] implementation.
//!
//! Maps each store operation onto parameterized SQL against the schema
//! created by [`crate::migrate`]. Chunk embeddings are stored as
//! little-endian f32 `BYTEA` blobs ([`vec_to_blob`]); metadata columns are
//! `jsonb`, written as serialized text and parsed back on read.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::{ChunkRecord, Document, NewChunk};
use serde_json::{Map, Value};

use super::DocumentStore;

/// Postgres implementation of the [`DocumentStore`] trait.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_metadata(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or_else(|_| serde_json::json!({}))
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Document {
    Document {
        id: row.get("id"),
        filename: row.get("filename"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        upload_date: row.get("upload_date"),
        metadata: parse_metadata(row.get("metadata")),
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn create_document(
        &self,
        filename: &str,
        file_type: &str,
        file_size: i64,
        metadata: &Map<String, Value>,
    ) -> Result<i64> {
        let metadata_json = Value::Object(metadata.clone()).to_string();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO documents (filename, file_type, file_size, metadata)
            VALUES ($1, $2, $3, $4::jsonb)
            RETURNING id
            "#,
        )
        .bind(filename)
        .bind(file_type)
        .bind(file_size)
        .bind(&metadata_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn store_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (index, chunk) in chunks.iter().enumerate() {
            let metadata_json = Value::Object(chunk.metadata.clone()).to_string();
            let embedding_blob = chunk.embedding.as_ref().map(|v| vec_to_blob(v));
            sqlx::query(
                r#"
                INSERT INTO document_chunks (document_id, chunk_text, chunk_index, embedding, metadata)
                VALUES ($1, $2, $3, $4, $5::jsonb)
                "#,
            )
            .bind(document_id)
            .bind(&chunk.text)
            .bind(index as i64)
            .bind(embedding_blob)
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, file_type, file_size, upload_date, metadata::text AS metadata
            FROM documents WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_document))
    }

    async fn get_chunks(&self, document_id: i64) -> Result<Vec<ChunkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, chunk_text, chunk_index, embedding, metadata::text AS metadata
            FROM document_chunks
            WHERE document_id = $1
            ORDER BY chunk_index ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let embedding: Option<Vec<u8>> = row.get("embedding");
                ChunkRecord {
                    id: row.get("id"),
                    document_id: row.get("document_id"),
                    text: row.get("chunk_text"),
                    chunk_index: row.get("chunk_index"),
                    embedding: embedding.map(|blob| blob_to_vec(&blob)),
                    metadata: parse_metadata(row.get("metadata")),
                }
            })
            .collect())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, filename, file_type, file_size, upload_date, metadata::text AS metadata
            FROM documents
            ORDER BY upload_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn delete_document(&self, id: i64) -> Result<()> {
        // Chunk removal rides on the ON DELETE CASCADE constraint.
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("document {}", id)));
        }
        Ok(())
    }

    async fn record_query(
        &self,
        query_text: &str,
        document_id: Option<i64>,
        result_text: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queries (query_text, document_id, result_text)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(query_text)
        .bind(document_id)
        .bind(result_text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
