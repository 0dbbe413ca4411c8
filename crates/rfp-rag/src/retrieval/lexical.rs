//! BM25 keyword index over chunk text

use bm25::{Document, Language, SearchEngine, SearchEngineBuilder};

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Keyword index keyed by chunk position
pub struct LexicalIndex {
    engine: SearchEngine<usize>,
    len: usize,
}

impl LexicalIndex {
    /// Index every chunk. Fails when there is nothing to index.
    pub fn build(chunks: &[Chunk]) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::internal("lexical index needs at least one chunk"));
        }

        let documents: Vec<Document<usize>> = chunks
            .iter()
            .map(|chunk| Document {
                id: chunk.position,
                contents: chunk.content.clone(),
            })
            .collect();

        let engine = SearchEngineBuilder::<usize>::with_documents(Language::English, documents).build();

        Ok(Self {
            engine,
            len: chunks.len(),
        })
    }

    /// Top `k` chunk positions by BM25 score, best first.
    pub fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)> {
        self.engine
            .search(query, k)
            .into_iter()
            .map(|result| (result.document.id, result.score))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
