//! Query service: retrieval-augmented answers over stored chunks.
//!
//! A [`QueryService`] is constructed once at startup from configuration and
//! injected wherever queries are served. With language-model credentials it
//! pairs the Groq client with local embeddings; without them everything
//! runs on the offline substitutes. `answer` never fails (a model error
//! degrades to a textual error message), and every invocation is recorded
//! in the store's query log afterwards, whatever mode produced the answer.
//!
//! Two scopes:
//! - [`ask_document`](QueryService::ask_document) — one document's chunks
//! - [`ask_all`](QueryService::ask_all) — every document's chunks, each
//!   tagged with its source document's id and filename before indexing so
//!   results stay traceable to their origin

use std::sync::Arc;

use serde_json::json;

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::index::{build_index, IndexedChunk};
use crate::llm::{GroqModel, LanguageModel, OfflineModel};
use crate::models::Document;
use crate::store::DocumentStore;

pub struct QueryService {
    model: Box<dyn LanguageModel>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl QueryService {
    /// Build the service for the configured mode.
    pub fn from_config(config: &Config) -> Self {
        if config.llm.is_configured() {
            match GroqModel::new(&config.llm) {
                Ok(model) => {
                    let embedder = embedding::local_provider();
                    if embedder.is_none() {
                        tracing::warn!(
                            "built without local-embeddings; retrieval uses the leading-order substitute"
                        );
                    }
                    return Self {
                        model: Box::new(model),
                        embedder,
                    };
                }
                Err(err) => {
                    tracing::warn!(error = %err, "language model unavailable, using offline substitute");
                }
            }
        } else {
            tracing::info!("no language-model credentials configured, using offline substitute");
        }
        Self::offline()
    }

    /// The fully offline service: placeholder answers, leading-order
    /// retrieval. Used without credentials and throughout the tests.
    pub fn offline() -> Self {
        Self {
            model: Box::new(OfflineModel),
            embedder: None,
        }
    }

    /// Answer `query` over the given chunks.
    ///
    /// Builds a retrieval index, retrieves context, and asks the model.
    /// Model failure degrades to an error message in the returned text.
    pub async fn answer(&self, query: &str, chunks: Vec<IndexedChunk>) -> String {
        let index = build_index(chunks, self.embedder.clone()).await;
        let retrieved = index.retrieve(query).await;
        let context: Vec<String> = retrieved.into_iter().map(|c| c.text).collect();
        match self.model.answer(query, &context).await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "language model call failed");
                format!("Failed to process query: {}", err)
            }
        }
    }

    /// Answer a query scoped to one document.
    pub async fn ask_document(
        &self,
        store: &dyn DocumentStore,
        document_id: i64,
        query: &str,
    ) -> Result<String> {
        if store.get_document(document_id).await?.is_none() {
            return Err(Error::NotFound(format!("document {}", document_id)));
        }
        let chunks = store
            .get_chunks(document_id)
            .await?
            .into_iter()
            .map(IndexedChunk::from_record)
            .collect();
        let answer = self.answer(query, chunks).await;
        record(store, query, Some(document_id), &answer).await;
        Ok(answer)
    }

    /// Answer a query over the union of all documents' chunks.
    pub async fn ask_all(&self, store: &dyn DocumentStore, query: &str) -> Result<String> {
        let chunks = gather_all_chunks(store).await?;
        let answer = self.answer(query, chunks).await;
        record(store, query, None, &answer).await;
        Ok(answer)
    }
}

/// Collect every document's chunks, each tagged with its source document.
pub async fn gather_all_chunks(store: &dyn DocumentStore) -> Result<Vec<IndexedChunk>> {
    let mut all = Vec::new();
    for document in store.list_documents().await? {
        for chunk in store.get_chunks(document.id).await? {
            all.push(annotate_with_source(
                IndexedChunk::from_record(chunk),
                &document,
            ));
        }
    }
    Ok(all)
}

/// Tag a chunk with its owning document so global results stay traceable.
pub fn annotate_with_source(mut chunk: IndexedChunk, document: &Document) -> IndexedChunk {
    chunk
        .metadata
        .insert("document_id".to_string(), json!(document.id));
    chunk
        .metadata
        .insert("document_name".to_string(), json!(document.filename));
    chunk
}

async fn record(store: &dyn DocumentStore, query: &str, document_id: Option<i64>, answer: &str) {
    // The answer is already in hand; a logging failure is reported but does
    // not turn a served answer into a user-facing error.
    if let Err(err) = store.record_query(query, document_id, answer).await {
        tracing::warn!(error = %err, "failed to record query in audit log");
    }
}
