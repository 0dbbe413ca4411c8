//! Core types for the RFP RAG service

pub mod document;
pub mod entities;
pub mod extraction;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, Document, FileType, PageSpan};
pub use entities::{EntityExtractionResult, EntityMention};
pub use extraction::{
    EligibilityRequirement, ExtractionSchema, FormattingRequirements, MergedExtraction, PageLimit,
    SubmissionDetails,
};
pub use query::QueryRequest;
pub use response::{QueryResponse, SourceChunk, UploadResponse};
