//! Turns uploaded bytes into a document and its retrieval chunks

use uuid::Uuid;

use super::chunker::TextChunker;
use super::parser::FileParser;
use crate::error::Result;
use crate::types::{Chunk, ChunkSource, Document};

/// Parse and chunk one upload. CPU bound; callers run it off the async runtime.
pub fn process_upload(
    filename: &str,
    data: &[u8],
    chunker: &TextChunker,
) -> Result<(Document, Vec<Chunk>)> {
    let parsed = FileParser::parse(filename, data)?;

    let document = Document {
        id: Uuid::new_v4(),
        filename: filename.to_string(),
        file_type: parsed.file_type,
        content_hash: parsed.content_hash(),
        file_size: data.len() as u64,
        total_pages: parsed.total_pages,
        loaded_at: chrono::Utc::now(),
        full_text: parsed.full_text,
        pages: parsed.pages,
    };

    let chunks: Vec<Chunk> = chunker
        .split(&document.full_text)
        .filter(|span| !span.text.trim().is_empty())
        .enumerate()
        .map(|(position, span)| Chunk {
            id: Uuid::new_v4(),
            position,
            content: span.text.to_string(),
            source: ChunkSource {
                filename: document.filename.clone(),
                page_number: document.page_at(span.start),
                start: span.start,
                end: span.end,
            },
        })
        .collect();

    tracing::info!(
        "Processed '{}': {} chars, {} chunks",
        filename,
        document.full_text.chars().count(),
        chunks.len()
    );
    Ok((document, chunks))
}
