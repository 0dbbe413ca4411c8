//! Hybrid retrieval: keyword index, vector index, fusion, reranking

pub mod fusion;
pub mod lexical;
pub mod rerank;
pub mod semantic;

use std::sync::Arc;

use crate::types::Chunk;

pub use fusion::{weighted_fusion, FusionRetriever, FusionWeights};
pub use lexical::LexicalIndex;
pub use rerank::{CohereReranker, RerankMode, RerankStage, Reranker};
pub use semantic::SemanticIndex;

/// A chunk with the score from the stage that produced it.
///
/// Scores from different stages are not comparable.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    pub score: f32,
}
