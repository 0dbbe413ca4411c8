//! rfp-rag: Hybrid retrieval and structured extraction for RFP documents
//!
//! One uploaded document is active at a time. Questions are answered from
//! chunks found by a fused keyword + vector search, optionally reranked by a
//! cross-encoder service. Independently, the full text can be run through a
//! chunk-wise structured extractor or a local entity and pattern extractor.

pub mod config;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use session::RagSession;
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    extraction::{ExtractionSchema, MergedExtraction},
    query::QueryRequest,
    response::{QueryResponse, SourceChunk, UploadResponse},
};
