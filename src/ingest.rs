//! Ingestion pipeline: file → loader → normalize → chunk → store.
//!
//! One call per uploaded file. The pipeline owns no temp files; the caller
//! (HTTP handler or CLI) controls the file's lifecycle. Storage of the
//! document record and its chunks is one logical unit: if chunk storage
//! fails after the document row was created, the row is removed best-effort
//! and the failure is reported, so a document is never visible without its
//! chunks.

use std::path::Path;

use serde_json::json;

use crate::chunk::split_blocks;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::loader;
use crate::metadata::normalize;
use crate::models::TextBlock;
use crate::store::DocumentStore;

/// Ingest one file and return the new document's identifier.
///
/// `embedder` is optional: when present, chunk texts are embedded inline and
/// stored with their vectors; an embedding failure is non-fatal and the
/// chunks are stored without vectors.
pub async fn ingest_file(
    store: &dyn DocumentStore,
    embedder: Option<&dyn EmbeddingProvider>,
    path: &Path,
    original_filename: &str,
    file_type: &str,
    file_size: i64,
) -> Result<i64> {
    let blocks = loader::load_file(path)?;
    if blocks.iter().all(|b| b.text.trim().is_empty()) {
        return Err(Error::EmptyDocument);
    }

    let blocks: Vec<TextBlock> = blocks
        .into_iter()
        .map(|b| TextBlock {
            metadata: normalize(&b.metadata),
            text: b.text,
        })
        .collect();

    let mut chunks = split_blocks(&blocks);

    // Inline embedding is best-effort; the document is stored either way.
    if let Some(provider) = embedder {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        match provider.embed(&texts).await {
            Ok(vectors) => {
                for (chunk, vector) in chunks.iter_mut().zip(vectors) {
                    chunk.embedding = Some(vector);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "embedding failed, storing chunks without vectors");
            }
        }
    }

    let mut document_metadata = serde_json::Map::new();
    document_metadata.insert("source".to_string(), json!("upload"));
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    document_metadata.insert("file_extension".to_string(), json!(extension));
    document_metadata.insert("type".to_string(), json!(loader::type_label(&extension)));

    let document_id = store
        .create_document(original_filename, file_type, file_size, &document_metadata)
        .await?;

    if let Err(err) = store.store_chunks(document_id, &chunks).await {
        tracing::error!(document_id, error = %err, "chunk storage failed, removing document record");
        if let Err(cleanup) = store.delete_document(document_id).await {
            tracing::warn!(document_id, error = %cleanup, "could not remove document after failed chunk storage");
        }
        return Err(err);
    }

    tracing::info!(
        document_id,
        filename = original_filename,
        chunks = chunks.len(),
        "document ingested"
    );
    Ok(document_id)
}
