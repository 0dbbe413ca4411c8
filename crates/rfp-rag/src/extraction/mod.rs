//! Structured extraction and entity tagging over a document's full text

mod entities;
mod fence;
mod merge;
mod structured;

pub use entities::{EntityExtractor, EntityTagger, HeuristicTagger, TaggedSpan};
pub use fence::{json_candidate, parse_extraction};
pub use merge::merge_extractions;
pub use structured::{
    ChunkReport, ChunkStatus, ExtractionPhase, ExtractionReport, StructuredExtractor,
};
