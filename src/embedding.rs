//! Embedding provider abstraction and implementations.
//!
//! Two providers stand behind the [`EmbeddingProvider`] trait:
//!
//! - **[`LocalProvider`]** — runs all-MiniLM-L6-v2 locally via fastembed
//!   (feature `local-embeddings`, on by default); the model is downloaded on
//!   first use and cached, after which no network access is needed.
//! - **[`OfflineProvider`]** — the credential-free substitute: a fixed
//!   deterministic vector for every text, so development and tests never
//!   touch model files.
//!
//! Also provides vector utilities shared with the relational store:
//! [`vec_to_blob`] / [`blob_to_vec`] encode embeddings as little-endian f32
//! bytes for `BYTEA` columns, and [`cosine_similarity`] scores candidate
//! chunks during retrieval.

use async_trait::async_trait;

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

// ============ Offline substitute ============

/// Fixed vector returned by the offline provider for every input.
pub const OFFLINE_EMBEDDING: [f32; 5] = [0.1, 0.2, 0.3, 0.4, 0.5];

/// Deterministic, credential-free embedding substitute.
pub struct OfflineProvider;

#[async_trait]
impl EmbeddingProvider for OfflineProvider {
    fn model_name(&self) -> &str {
        "offline"
    }

    fn dims(&self) -> usize {
        OFFLINE_EMBEDDING.len()
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(vec![OFFLINE_EMBEDDING.to_vec(); texts.len()])
    }
}

// ============ Local provider (fastembed) ============

/// Local inference via fastembed (all-MiniLM-L6-v2, 384 dims).
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new() -> Self {
        Self {
            model_name: "all-minilm-l6-v2".to_string(),
            dims: 384,
        }
    }
}

#[cfg(feature = "local-embeddings")]
impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                    .with_show_download_progress(false),
            )
            .map_err(|e| anyhow::anyhow!("failed to initialize local embedding model: {}", e))?;

            model
                .embed(texts, None)
                .map_err(|e| anyhow::anyhow!("local embedding failed: {}", e))
        })
        .await?
    }
}

/// The local provider when the feature is compiled in, `None` otherwise.
///
/// Callers treat `None` as "no embedding capability": retrieval falls back
/// to its offline substitute and ingestion stores chunks without vectors.
pub fn local_provider() -> Option<std::sync::Arc<dyn EmbeddingProvider>> {
    #[cfg(feature = "local-embeddings")]
    {
        Some(std::sync::Arc::new(LocalProvider::new()))
    }
    #[cfg(not(feature = "local-embeddings"))]
    {
        None
    }
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian f32 bytes for BYTEA storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BYTEA blob back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn offline_provider_is_deterministic() {
        let provider = OfflineProvider;
        let texts = vec!["one".to_string(), "two".to_string()];
        let vectors = provider.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        for v in &vectors {
            assert_eq!(v.as_slice(), OFFLINE_EMBEDDING.as_slice());
            assert_eq!(v.len(), provider.dims());
        }
    }
}
