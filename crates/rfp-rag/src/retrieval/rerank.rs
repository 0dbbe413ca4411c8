//! Optional cross-encoder reranking
//!
//! [`RerankStage`] always answers: with no service configured, or when the
//! service fails, it returns the fused candidates truncated to `top_n`.
//! [`RerankStage::mode`] reports which behavior is active.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::ScoredChunk;
use crate::config::RerankConfig;
use crate::error::{Error, Result};

/// Which reranking behavior is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankMode {
    /// Candidates are rescored by an external service
    CrossEncoder,
    /// Candidates are truncated in their fused order
    PassThrough,
}

/// A service that rescores candidates against the query
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Return up to `top_n` candidates, best first, scored by relevance.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[ScoredChunk],
        top_n: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Cohere-compatible `/rerank` client
pub struct CohereReranker {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    relevance_score: f32,
}

impl CohereReranker {
    pub fn new(config: &RerankConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create rerank client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[ScoredChunk],
        top_n: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let request = RerankRequest {
            model: &self.model,
            query,
            documents: candidates.iter().map(|c| c.chunk.content.as_str()).collect(),
            top_n: top_n.min(candidates.len()),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_upstream("rerank", e))?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "rerank service returned HTTP {}",
                response.status()
            )));
        }

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("invalid rerank response: {}", e)))?;

        rank_hits(candidates, body.results, top_n)
    }

    fn name(&self) -> &str {
        "cohere"
    }
}

/// Map service hits back onto the candidates they index, best first
fn rank_hits(
    candidates: &[ScoredChunk],
    mut hits: Vec<RerankHit>,
    top_n: usize,
) -> Result<Vec<ScoredChunk>> {
    hits.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    hits.into_iter()
        .take(top_n)
        .map(|hit| {
            candidates
                .get(hit.index)
                .map(|c| ScoredChunk {
                    chunk: Arc::clone(&c.chunk),
                    score: hit.relevance_score,
                })
                .ok_or_else(|| {
                    Error::upstream(format!("rerank returned out-of-range index {}", hit.index))
                })
        })
        .collect()
}

/// Reranking step of the query pipeline
#[derive(Clone)]
pub struct RerankStage {
    reranker: Option<Arc<dyn Reranker>>,
}

impl RerankStage {
    /// Cross-encoder when an API key is configured, pass-through otherwise.
    pub fn from_config(config: &RerankConfig) -> Result<Self> {
        match config.api_key.as_deref() {
            Some(key) => {
                tracing::info!(
                    "Reranking enabled via {} (model {})",
                    config.endpoint,
                    config.model
                );
                Ok(Self::with_reranker(Arc::new(CohereReranker::new(config, key)?)))
            }
            None => {
                tracing::info!("No rerank API key configured; reranking is pass-through");
                Ok(Self::pass_through())
            }
        }
    }

    pub fn pass_through() -> Self {
        Self { reranker: None }
    }

    pub fn with_reranker(reranker: Arc<dyn Reranker>) -> Self {
        Self {
            reranker: Some(reranker),
        }
    }

    /// Capability flag for observability
    pub fn mode(&self) -> RerankMode {
        match self.reranker {
            Some(_) => RerankMode::CrossEncoder,
            None => RerankMode::PassThrough,
        }
    }

    /// Rerank `candidates`, keeping at most `top_n`. Never fails.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredChunk>,
        top_n: usize,
    ) -> Vec<ScoredChunk> {
        let Some(reranker) = &self.reranker else {
            return truncate(candidates, top_n);
        };

        match reranker.rerank(query, &candidates, top_n).await {
            Ok(reranked) => reranked,
            Err(e) => {
                tracing::warn!(
                    "Reranker '{}' failed, using fused order: {}",
                    reranker.name(),
                    e
                );
                truncate(candidates, top_n)
            }
        }
    }
}

fn truncate(mut candidates: Vec<ScoredChunk>, top_n: usize) -> Vec<ScoredChunk> {
    candidates.truncate(top_n);
    candidates
}
