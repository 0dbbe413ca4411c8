//! Application state for the RFP RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{
    EmbeddingProvider, LlmProvider, OllamaClient, OllamaEmbedder, OllamaLlm,
};
use crate::retrieval::RerankStage;
use crate::session::RagSession;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Active document and pipelines
    session: RagSession,
    /// Ollama client, when the providers are Ollama-backed
    ollama: Option<Arc<OllamaClient>>,
}

impl AppState {
    /// Create state backed by Ollama and, if configured, the rerank service
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RFP RAG application state...");

        let ollama = Arc::new(OllamaClient::new(&config.llm)?);
        tracing::info!(
            "Ollama client initialized at {} (using {} for embeddings)",
            ollama.base_url(),
            config.embeddings.model
        );

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbedder::new(
            Arc::clone(&ollama),
            config.embeddings.model.clone(),
            config.embeddings.dimensions,
        ));
        let answer_llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::new(
            Arc::clone(&ollama),
            config.llm.answer_model.clone(),
            config.llm.answer_temperature,
        ));
        let extraction_llm: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::new(
            Arc::clone(&ollama),
            config.llm.extraction_model.clone(),
            config.llm.extraction_temperature,
        ));
        let reranker = RerankStage::from_config(&config.rerank)?;

        let session = RagSession::new(config, embedder, answer_llm, extraction_llm, reranker)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                session,
                ollama: Some(ollama),
            }),
        })
    }

    /// Wrap an already-wired session
    pub fn from_session(session: RagSession) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                session,
                ollama: None,
            }),
        }
    }

    pub fn session(&self) -> &RagSession {
        &self.inner.session
    }

    pub fn config(&self) -> &RagConfig {
        self.inner.session.config()
    }

    /// Get Ollama client
    pub fn ollama(&self) -> Option<&Arc<OllamaClient>> {
        self.inner.ollama.as_ref()
    }

    /// Check if a document is active and queryable
    pub fn is_ready(&self) -> bool {
        self.inner.session.is_ready()
    }
}
