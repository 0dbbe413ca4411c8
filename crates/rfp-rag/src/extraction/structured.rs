//! Chunk-wise structured extraction
//!
//! The full text is split into large chunks; each chunk is sent to the model
//! with the extraction prompt, its response parsed on its own, and the parsed
//! records merged in document order. A chunk that fails is recorded in the
//! report and skipped. Only when no chunk parses does the request fail.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use super::fence::parse_extraction;
use super::merge::merge_extractions;
use crate::config::{ChunkingConfig, ExtractionConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::ingestion::TextChunker;
use crate::providers::LlmProvider;
use crate::types::{ExtractionSchema, MergedExtraction};

/// Longest model-output excerpt kept in a chunk report
const EXCERPT_CHARS: usize = 200;

/// Extraction state, logged on each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPhase {
    Chunking,
    PerChunkExtraction,
    Merging,
    Done,
    Failed,
}

/// Outcome of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Parsed,
    MalformedOutput,
    SchemaMismatch,
    InvocationFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    /// Chunk position in document order
    pub index: usize,
    pub status: ChunkStatus,
    /// Failure message with a bounded excerpt of the output, if any
    pub detail: Option<String>,
}

/// Merged record plus what happened to every chunk
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub merged: MergedExtraction,
    pub chunks: Vec<ChunkReport>,
}

impl ExtractionReport {
    pub fn parsed_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Parsed)
            .count()
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Runs the extraction prompt over every chunk and merges the results
pub struct StructuredExtractor {
    llm: Arc<dyn LlmProvider>,
    chunker: TextChunker,
    max_concurrency: usize,
}

impl StructuredExtractor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        chunking: &ChunkingConfig,
        extraction: &ExtractionConfig,
    ) -> Self {
        Self {
            llm,
            chunker: TextChunker::from_config(chunking),
            max_concurrency: extraction.max_concurrency.max(1),
        }
    }

    fn enter(&self, phase: ExtractionPhase, chunks: usize, parsed: usize) {
        tracing::info!(
            ?phase,
            chunks,
            parsed,
            model = self.llm.model(),
            "Structured extraction"
        );
    }

    /// Extract one consolidated record from `text`.
    pub async fn extract(&self, text: &str) -> Result<ExtractionReport> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput("no text provided for extraction".into()));
        }
        let start = Instant::now();

        self.enter(ExtractionPhase::Chunking, 0, 0);
        let sections: Vec<&str> = self
            .chunker
            .split(text)
            .map(|span| span.text)
            .filter(|s| !s.trim().is_empty())
            .collect();
        if sections.is_empty() {
            return Err(Error::EmptyInput("text produced no chunks".into()));
        }

        self.enter(ExtractionPhase::PerChunkExtraction, sections.len(), 0);
        let permits = Semaphore::new(self.max_concurrency);
        let outcomes = join_all(
            sections
                .iter()
                .enumerate()
                .map(|(index, section)| self.extract_chunk(&permits, index, section)),
        )
        .await;

        let mut records: Vec<ExtractionSchema> = Vec::new();
        let mut chunks = Vec::with_capacity(outcomes.len());
        for (report, record) in outcomes {
            if let Some(record) = record {
                records.push(record);
            }
            chunks.push(report);
        }

        if records.is_empty() {
            self.enter(ExtractionPhase::Failed, sections.len(), 0);
            return Err(Error::ExtractionFailed(format!(
                "none of the {} chunks produced a usable result",
                sections.len()
            )));
        }

        self.enter(ExtractionPhase::Merging, sections.len(), records.len());
        let merged = merge_extractions(&records);

        self.enter(ExtractionPhase::Done, sections.len(), records.len());
        tracing::info!("Structured extraction finished in {:?}", start.elapsed());

        Ok(ExtractionReport { merged, chunks })
    }

    async fn extract_chunk(
        &self,
        permits: &Semaphore,
        index: usize,
        section: &str,
    ) -> (ChunkReport, Option<ExtractionSchema>) {
        let prompt = PromptBuilder::build_extraction_prompt(section);

        let response = match permits.acquire().await {
            Ok(_permit) => self.llm.generate(&prompt).await,
            Err(e) => Err(Error::internal(format!("extraction semaphore closed: {}", e))),
        };

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(chunk = index, "Extraction call failed: {}", e);
                let report = ChunkReport {
                    index,
                    status: ChunkStatus::InvocationFailed,
                    detail: Some(e.to_string()),
                };
                return (report, None);
            }
        };

        match parse_extraction(&raw) {
            Ok(record) => {
                tracing::debug!(chunk = index, "Chunk parsed");
                let report = ChunkReport {
                    index,
                    status: ChunkStatus::Parsed,
                    detail: None,
                };
                (report, Some(record))
            }
            Err(e) => {
                let status = match e {
                    Error::SchemaMismatch(_) => ChunkStatus::SchemaMismatch,
                    _ => ChunkStatus::MalformedOutput,
                };
                tracing::warn!(
                    chunk = index,
                    ?status,
                    "Skipping chunk: {}; output: {}",
                    e,
                    excerpt(&raw)
                );
                let report = ChunkReport {
                    index,
                    status,
                    detail: Some(format!("{}; output: {}", e, excerpt(&raw))),
                };
                (report, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers by the text of the section embedded in the prompt
    struct Scripted {
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let section = prompt
                .split("-------\n")
                .nth(1)
                .unwrap_or_default();

            if section.contains("AGENCY-ONE") {
                Ok("{\"issuing_agency\": \"Agency One\"}\n```".into())
            } else if section.contains("AGENCY-TWO") {
                Ok("```json\n{\"issuing_agency\": \"Agency Two\", \"solicitation_number\": \"ABC-123\"}\n```".into())
            } else if section.contains("GARBLED") {
                Ok("Sure! Here you go: {issuing_agency: none".into())
            } else if section.contains("WRONG-SHAPE") {
                Ok("{\"eligibility_criteria\": \"ISO 9001\"}".into())
            } else if section.contains("OFFLINE") {
                Err(Error::upstream("connection refused"))
            } else {
                Ok("{}".into())
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn extractor(llm: Arc<Scripted>) -> StructuredExtractor {
        let chunking = ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 0,
            separators: vec!["\n\n".into(), "".into()],
        };
        StructuredExtractor::new(llm, &chunking, &ExtractionConfig { max_concurrency: 2 })
    }

    #[tokio::test]
    async fn test_empty_input() {
        let extractor = extractor(Arc::new(Scripted::new()));
        let err = extractor.extract("  \n ").await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[tokio::test]
    async fn test_merge_follows_document_order() {
        let llm = Arc::new(Scripted::new());
        let text = "AGENCY-ONE section text\n\nGARBLED section text\n\nAGENCY-TWO section text";
        let report = extractor(llm.clone()).extract(text).await.unwrap();

        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.merged.issuing_agency.as_deref(), Some("Agency One"));
        assert_eq!(report.merged.solicitation_number.as_deref(), Some("ABC-123"));

        let statuses: Vec<ChunkStatus> = report.chunks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![ChunkStatus::Parsed, ChunkStatus::MalformedOutput, ChunkStatus::Parsed]
        );
        assert_eq!(report.parsed_count(), 2);
    }

    /// Sleeps longest on the earliest section so responses arrive in reverse
    struct Staggered {
        finished: parking_lot::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for Staggered {
        async fn generate(&self, prompt: &str) -> Result<String> {
            let section = prompt.split("-------\n").nth(1).unwrap_or_default();
            let name = section.split_whitespace().next().unwrap_or_default().to_string();
            let delay = match name.as_str() {
                "FIRST" => 80,
                "SECOND" => 40,
                _ => 0,
            };
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            self.finished.lock().push(name.clone());
            Ok(format!(
                "{{\"issuing_agency\": \"{0} Agency\", \"solicitation_number\": \"{0}-1\"}}",
                name
            ))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "staggered"
        }

        fn model(&self) -> &str {
            "staggered"
        }
    }

    #[tokio::test]
    async fn test_merge_ignores_completion_order() {
        let llm = Arc::new(Staggered {
            finished: parking_lot::Mutex::new(Vec::new()),
        });
        let chunking = ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 0,
            separators: vec!["\n\n".into(), "".into()],
        };
        let extractor =
            StructuredExtractor::new(llm.clone(), &chunking, &ExtractionConfig { max_concurrency: 3 });

        let text = "FIRST agency section\n\nSECOND agency section\n\nTHIRD agency section";
        let report = extractor.extract(text).await.unwrap();

        assert_eq!(*llm.finished.lock(), vec!["THIRD", "SECOND", "FIRST"]);
        assert_eq!(report.merged.issuing_agency.as_deref(), Some("FIRST Agency"));
        assert_eq!(report.merged.solicitation_number.as_deref(), Some("FIRST-1"));
        let indices: Vec<usize> = report.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_all_null_chunk_is_a_valid_result() {
        let report = extractor(Arc::new(Scripted::new()))
            .extract("nothing of interest here")
            .await
            .unwrap();
        assert_eq!(report.merged, MergedExtraction::default());
        assert_eq!(report.parsed_count(), 1);
    }

    #[tokio::test]
    async fn test_every_chunk_failing_is_extraction_failed() {
        let text = "GARBLED section text\n\nWRONG-SHAPE section\n\nOFFLINE section text";
        let err = extractor(Arc::new(Scripted::new()))
            .extract(text)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).chars().count(), EXCERPT_CHARS + 3);
        assert_eq!(excerpt(" short "), "short");
    }
}
