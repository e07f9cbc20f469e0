//! Text embedding interfaces.
//!
//! The [`Embeddings`] trait turns text into fixed-dimension vectors through
//! an external provider. Implementations must preserve input order: one
//! vector per input text, same position.
//!
//! [`MockEmbeddings`] is a deterministic, network-free implementation used
//! throughout the test suites.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for embedding providers.
///
/// The `model` parameter selects the provider-side embedding model; the
/// caller (the knowledge base) is responsible for batching inputs into
/// chunks of its configured size before calling.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a batch of documents, order-preserving.
    async fn embed_documents(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .embed_documents(std::slice::from_ref(&text.to_string()), model)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| Error::provider("embedding provider returned no vector for query"))
    }
}

/// Deterministic mock embeddings provider for testing.
///
/// Generates normalized vectors derived from the text bytes, so identical
/// texts always map to identical vectors and different texts almost always
/// differ. No network, no API keys.
#[derive(Debug, Clone, Copy)]
pub struct MockEmbeddings {
    /// Dimensionality of generated vectors
    pub dimensions: usize,
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddings {
    /// Create a mock provider with 8-dimensional vectors
    #[must_use]
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    /// Create a mock provider with custom dimensionality
    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn generate_vector(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        let mut vector = Vec::with_capacity(self.dimensions);

        // Simple rolling-hash components: stable across runs and platforms.
        let mut acc: u32 = 2_166_136_261;
        for i in 0..self.dimensions {
            for (j, &b) in bytes.iter().enumerate() {
                if j % self.dimensions == i {
                    acc = acc.wrapping_mul(16_777_619) ^ u32::from(b);
                }
            }
            vector.push((acc % 1000) as f32 / 1000.0);
            acc = acc.wrapping_add(i as u32 + 1);
        }

        let magnitude: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vector.iter().map(|v| v / magnitude).collect()
        } else {
            vec![1.0 / (self.dimensions.max(1) as f32).sqrt(); self.dimensions]
        }
    }
}

#[async_trait]
impl Embeddings for MockEmbeddings {
    async fn embed_documents(&self, texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.generate_vector(t)).collect())
    }

    async fn embed_query(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
        Ok(self.generate_vector(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_order_preserving_and_deterministic() {
        let provider = MockEmbeddings::new();
        let texts = vec!["alpha".to_string(), "beta".to_string()];

        let first = provider.embed_documents(&texts, "m").await.unwrap();
        let second = provider.embed_documents(&texts, "m").await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn test_vectors_are_normalized() {
        let provider = MockEmbeddings::with_dimensions(16);
        let vecs = provider
            .embed_documents(&["some text".to_string()], "m")
            .await
            .unwrap();
        assert_eq!(vecs[0].len(), 16);
        let magnitude: f32 = vecs[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_query_matches_document_embedding() {
        let provider = MockEmbeddings::new();
        let doc = provider
            .embed_documents(&["same text".to_string()], "m")
            .await
            .unwrap();
        let query = provider.embed_query("same text", "m").await.unwrap();
        assert_eq!(doc[0], query);
    }

    #[tokio::test]
    async fn test_empty_text_still_normalized() {
        let provider = MockEmbeddings::new();
        let v = provider.embed_query("", "m").await.unwrap();
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-3);
    }
}
