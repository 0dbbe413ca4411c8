//! Generative model provider trait

use async_trait::async_trait;

use crate::error::Result;

/// A generative model bound to one model name and sampling temperature
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (mistral, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt and return the raw model text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}
