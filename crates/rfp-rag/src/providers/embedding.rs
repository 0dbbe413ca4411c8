//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, at most `parallelism` in flight.
    ///
    /// Output order matches input order.
    async fn embed_batch(&self, texts: &[String], parallelism: usize) -> Result<Vec<Vec<f32>>> {
        let futures: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        stream::iter(futures)
            .buffered(parallelism.max(1))
            .try_collect()
            .await
    }

    /// Embedding dimensions (e.g., 768 for nomic-embed-text)
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
