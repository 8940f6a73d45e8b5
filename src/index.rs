//! Retrieval index over a set of chunks.
//!
//! [`build_index`] turns the chunks selected for a query into a
//! [`ChunkIndex`] that can hand back the most relevant ones. Two tagged
//! variants stand behind it, chosen by whether an embedding capability was
//! supplied:
//!
//! - [`ChunkIndex::Vector`] — embeds every chunk (reusing vectors already
//!   stored at ingestion when their dimensionality matches) and scores the
//!   query against them with brute-force cosine similarity.
//! - [`ChunkIndex::Leading`] — the offline substitute: the first
//!   [`OFFLINE_RETRIEVE_K`] chunks in stored order, regardless of query.
//!
//! An embedding failure while building or querying degrades to the leading
//! behavior rather than surfacing an error; retrieval never fails, it only
//! gets less clever.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::models::ChunkRecord;

/// Chunks handed to the language model per query in vector mode.
pub const RETRIEVE_K: usize = 4;

/// Chunks returned by the offline substitute, regardless of query.
pub const OFFLINE_RETRIEVE_K: usize = 2;

/// A chunk prepared for indexing, detached from its storage row.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub text: String,
    pub metadata: Map<String, Value>,
    pub embedding: Option<Vec<f32>>,
}

impl IndexedChunk {
    pub fn from_record(record: ChunkRecord) -> Self {
        let metadata = match record.metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            text: record.text,
            metadata,
            embedding: record.embedding,
        }
    }
}

/// A built retrieval index.
pub enum ChunkIndex {
    Vector {
        entries: Vec<(IndexedChunk, Vec<f32>)>,
        provider: Arc<dyn EmbeddingProvider>,
    },
    Leading {
        chunks: Vec<IndexedChunk>,
    },
}

/// Build an index over `chunks`.
///
/// With `provider` present this embeds every chunk that does not already
/// carry a stored vector of the provider's dimensionality; without one, or
/// when embedding fails, the offline leading-order variant is used.
pub async fn build_index(
    chunks: Vec<IndexedChunk>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
) -> ChunkIndex {
    let Some(provider) = provider else {
        return ChunkIndex::Leading { chunks };
    };

    let dims = provider.dims();
    let missing: Vec<String> = chunks
        .iter()
        .filter(|c| !matches!(&c.embedding, Some(v) if v.len() == dims))
        .map(|c| c.text.clone())
        .collect();

    let fresh = if missing.is_empty() {
        Vec::new()
    } else {
        match provider.embed(&missing).await {
            Ok(vectors) => vectors,
            Err(err) => {
                tracing::warn!(error = %err, "chunk embedding failed, falling back to leading-order retrieval");
                return ChunkIndex::Leading { chunks };
            }
        }
    };

    let mut fresh = fresh.into_iter();
    let entries = chunks
        .into_iter()
        .map(|chunk| {
            let vector = match &chunk.embedding {
                Some(v) if v.len() == dims => v.clone(),
                _ => fresh.next().unwrap_or_default(),
            };
            (chunk, vector)
        })
        .collect();

    ChunkIndex::Vector { entries, provider }
}

impl ChunkIndex {
    /// Return the chunks most relevant to `query`.
    ///
    /// An empty index yields an empty result in both variants.
    pub async fn retrieve(&self, query: &str) -> Vec<IndexedChunk> {
        match self {
            ChunkIndex::Leading { chunks } => {
                chunks.iter().take(OFFLINE_RETRIEVE_K).cloned().collect()
            }
            ChunkIndex::Vector { entries, provider } => {
                if entries.is_empty() {
                    return Vec::new();
                }
                let query_vec = match provider.embed(&[query.to_string()]).await {
                    Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
                    Ok(_) | Err(_) => {
                        tracing::warn!("query embedding failed, falling back to leading-order retrieval");
                        return entries
                            .iter()
                            .take(OFFLINE_RETRIEVE_K)
                            .map(|(c, _)| c.clone())
                            .collect();
                    }
                };

                let mut scored: Vec<(f32, &IndexedChunk)> = entries
                    .iter()
                    .map(|(chunk, vector)| (cosine_similarity(&query_vec, vector), chunk))
                    .collect();
                scored.sort_by(|a, b| {
                    b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)
                });
                scored
                    .into_iter()
                    .take(RETRIEVE_K)
                    .map(|(_, chunk)| chunk.clone())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(text: &str) -> IndexedChunk {
        IndexedChunk {
            text: text.to_string(),
            metadata: Map::new(),
            embedding: None,
        }
    }

    struct StubProvider {
        embed_calls: AtomicUsize,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                embed_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        fn model_name(&self) -> &str {
            "stub"
        }

        fn dims(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.embed_calls.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("fruit") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn leading_index_returns_first_two_in_order() {
        let index = build_index(vec![chunk("a"), chunk("b"), chunk("c")], None).await;
        let retrieved = index.retrieve("anything").await;
        assert_eq!(retrieved.len(), OFFLINE_RETRIEVE_K);
        assert_eq!(retrieved[0].text, "a");
        assert_eq!(retrieved[1].text, "b");
    }

    #[tokio::test]
    async fn empty_index_retrieves_nothing() {
        let leading = build_index(Vec::new(), None).await;
        assert!(leading.retrieve("q").await.is_empty());

        let vector = build_index(Vec::new(), Some(Arc::new(StubProvider::new()))).await;
        assert!(vector.retrieve("q").await.is_empty());
    }

    #[tokio::test]
    async fn vector_index_ranks_by_similarity() {
        let chunks = vec![
            chunk("the weather today"),
            chunk("a fruit bowl of apples"),
            chunk("train schedules"),
        ];
        let index = build_index(chunks, Some(Arc::new(StubProvider::new()))).await;
        let retrieved = index.retrieve("which fruit is in season").await;
        assert_eq!(retrieved[0].text, "a fruit bowl of apples");
    }

    #[tokio::test]
    async fn stored_embeddings_are_reused() {
        let provider = Arc::new(StubProvider::new());
        let mut preembedded = chunk("already embedded fruit");
        preembedded.embedding = Some(vec![1.0, 0.0]);
        let _ = build_index(vec![preembedded], Some(provider.clone())).await;
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
    }
}
