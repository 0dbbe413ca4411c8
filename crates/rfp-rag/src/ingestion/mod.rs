//! Document loading and chunking

mod chunker;
mod parser;
mod processor;

pub use chunker::{Chunks, TextChunker, TextSpan};
pub use parser::{hash_content, FileParser, ParsedDocument};
pub use processor::process_upload;
