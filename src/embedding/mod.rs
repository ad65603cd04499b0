//! Embedding collaborator abstraction.
//!
//! The embedding model itself is external; the crate only requires that a
//! client turns text into fixed-length vectors with a stable dimensionality.
//! The bundled [`FeatureHashEmbedder`] is a deterministic stand-in suitable
//! for tests and local development.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector per supplied text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Dimensionality of every vector this client produces.
    fn dimension(&self) -> usize;
}

/// Deterministic embedding client that buckets byte content by position.
///
/// Similar texts land near each other because shared byte runs fill the same
/// slots; the output is L2-normalized so cosine scoring behaves.
pub struct FeatureHashEmbedder {
    dimension: usize,
}

impl FeatureHashEmbedder {
    /// Construct an embedder that emits vectors of the given dimensionality.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        if text.is_empty() {
            return vector;
        }

        for (position, byte) in text.bytes().enumerate() {
            let slot = position % self.dimension;
            vector[slot] += f32::from(byte) / 255.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingClient for FeatureHashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(
            dimension = self.dimension,
            texts = texts.len(),
            "Generating embeddings"
        );

        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic_and_sized() {
        let client = FeatureHashEmbedder::new(16);
        let texts = vec!["Paris is the capital of France.".to_string()];

        let first = client.embed(&texts).await.expect("first pass");
        let second = client.embed(&texts).await.expect("second pass");

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].len(), 16);
    }

    #[tokio::test]
    async fn vectors_are_normalized() {
        let client = FeatureHashEmbedder::new(8);
        let vectors = client
            .embed(&["some document text".to_string()])
            .await
            .expect("embedding");
        let norm = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let client = FeatureHashEmbedder::new(8);
        let err = client.embed(&[]).await.expect_err("empty batch");
        assert!(matches!(err, EmbeddingClientError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn rejects_zero_dimension() {
        let client = FeatureHashEmbedder::new(0);
        let err = client
            .embed(&["text".to_string()])
            .await
            .expect_err("zero dimension");
        assert!(matches!(err, EmbeddingClientError::GenerationFailed(_)));
    }
}
