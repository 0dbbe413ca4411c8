//! Response types for the HTTP surface

use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// Returned by `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    /// Number of retrieval chunks indexed
    pub total_chunks: usize,
    /// SHA-256 of the loaded text
    pub content_hash: String,
}

/// A chunk that supported an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChunk {
    pub content: String,
    pub metadata: serde_json::Value,
    /// Score from the last stage that ranked this chunk
    pub relevance_score: f32,
}

impl SourceChunk {
    pub fn from_chunk(chunk: &Chunk, relevance_score: f32) -> Self {
        Self {
            content: chunk.content.clone(),
            metadata: chunk.metadata(),
            relevance_score,
        }
    }
}

/// Returned by `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceChunk>,
}
