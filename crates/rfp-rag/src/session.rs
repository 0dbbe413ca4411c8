//! The single active document and the pipelines that run over it
//!
//! A load builds a complete [`ActiveDocument`] off to the side and swaps it
//! in only on success, so a failed load leaves the previous document active.
//! Loads are serialized. While one is running, queries and extraction
//! requests are rejected with `NotReady`.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::extraction::{EntityExtractor, ExtractionReport, StructuredExtractor};
use crate::generation::AnswerGenerator;
use crate::ingestion::{process_upload, TextChunker};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::{FusionRetriever, FusionWeights, RerankMode, RerankStage};
use crate::types::{
    Document, EntityExtractionResult, FileType, QueryRequest, QueryResponse, SourceChunk,
    UploadResponse,
};

const NO_DOCUMENT: &str = "No document loaded. Upload a document first.";
const LOAD_IN_PROGRESS: &str = "A document load is in progress. Try again when it completes.";

/// A loaded document with its retrieval indices
pub struct ActiveDocument {
    pub document: Document,
    pub retriever: FusionRetriever,
}

/// Resets the loading flag when a load ends, however it ends
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Upload bytes under a temporary name until the load succeeds.
///
/// Dropping an uncommitted upload removes the temporary file, so a failed
/// load never touches the stored copy of the active document.
struct StagedUpload {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedUpload {
    async fn write(dir: &Path, filename: &str, data: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let temp = dir.join(format!(".{}.{}.part", filename, uuid::Uuid::new_v4()));
        let staged = Self {
            temp,
            target: dir.join(filename),
            committed: false,
        };
        tokio::fs::write(&staged.temp, data).await?;
        Ok(staged)
    }

    async fn commit(mut self) -> Result<PathBuf> {
        tokio::fs::rename(&self.temp, &self.target).await?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.temp) {
                tracing::debug!("Could not remove {}: {}", self.temp.display(), e);
            }
        }
    }
}

/// Reduce a client-supplied name to its final path component
fn sanitize_filename(filename: &str) -> Result<String> {
    Path::new(filename.trim())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::UnsupportedFileType(format!("invalid file name '{}'", filename)))
}

/// Session over one active document
pub struct RagSession {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    reranker: RerankStage,
    answerer: AnswerGenerator,
    extractor: StructuredExtractor,
    entities: Arc<EntityExtractor>,
    active: RwLock<Option<Arc<ActiveDocument>>>,
    load_lock: Mutex<()>,
    loading: AtomicBool,
}

impl RagSession {
    /// Wire a session from its providers.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        answer_llm: Arc<dyn LlmProvider>,
        extraction_llm: Arc<dyn LlmProvider>,
        reranker: RerankStage,
    ) -> Result<Self> {
        let chunker = TextChunker::from_config(&config.retrieval_chunking);
        let extractor = StructuredExtractor::new(
            extraction_llm,
            &config.extraction_chunking,
            &config.extraction,
        );
        let entities = Arc::new(EntityExtractor::with_heuristics()?);

        tracing::info!(
            embedder = embedder.name(),
            answer_model = answer_llm.model(),
            rerank = ?reranker.mode(),
            "Session ready"
        );

        Ok(Self {
            chunker,
            embedder,
            reranker,
            answerer: AnswerGenerator::new(answer_llm),
            extractor,
            entities,
            active: RwLock::new(None),
            load_lock: Mutex::new(()),
            loading: AtomicBool::new(false),
            config,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn rerank_mode(&self) -> RerankMode {
        self.reranker.mode()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// True when a document is active and no load is running
    pub fn is_ready(&self) -> bool {
        !self.is_loading() && self.active.read().is_some()
    }

    /// The active document together with its retriever
    pub fn active(&self) -> Option<Arc<ActiveDocument>> {
        self.active.read().clone()
    }

    /// Model answering questions
    pub fn answer_model(&self) -> &str {
        self.answerer.model()
    }

    fn current(&self) -> Result<Arc<ActiveDocument>> {
        if self.is_loading() {
            return Err(Error::not_ready(LOAD_IN_PROGRESS));
        }
        self.active().ok_or_else(|| Error::not_ready(NO_DOCUMENT))
    }

    /// Store an upload, index it, and make it the active document.
    pub async fn load(&self, filename: &str, data: Vec<u8>) -> Result<UploadResponse> {
        let filename = sanitize_filename(filename)?;
        FileType::from_filename(&filename)?;

        let _serial = self.load_lock.lock().await;
        let _loading = LoadingGuard::set(&self.loading);
        let start = Instant::now();

        let staged =
            StagedUpload::write(&self.config.storage.uploads_dir, &filename, &data).await?;

        let chunker = self.chunker.clone();
        let name = filename.clone();
        let (document, chunks) =
            tokio::task::spawn_blocking(move || process_upload(&name, &data, &chunker))
                .await
                .map_err(|e| Error::internal(format!("document processing task failed: {}", e)))??;

        if chunks.is_empty() {
            return Err(Error::EmptyDocument(filename));
        }
        let total_chunks = chunks.len();

        let retrieval = &self.config.retrieval;
        let retriever = FusionRetriever::build(
            chunks,
            Arc::clone(&self.embedder),
            FusionWeights {
                semantic: retrieval.semantic_weight,
                lexical: retrieval.lexical_weight,
            },
            self.config.embeddings.parallelism,
        )
        .await?;

        let path = staged.commit().await?;
        tracing::info!("Saved upload to {}", path.display());

        let content_hash = document.content_hash.clone();
        let previous = self
            .active
            .write()
            .replace(Arc::new(ActiveDocument { document, retriever }));

        if let Some(previous) = previous {
            tracing::info!("Replaced active document '{}'", previous.document.filename);
        }
        tracing::info!(
            "Loaded '{}' ({} chunks) in {:?}",
            filename,
            total_chunks,
            start.elapsed()
        );

        Ok(UploadResponse {
            message: format!("File '{}' uploaded and processed successfully.", filename),
            filename,
            total_chunks,
            content_hash,
        })
    }

    /// Answer a question from the active document.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let question = request.normalized()?;
        let active = self.current()?;
        let retrieval = &self.config.retrieval;

        let candidates = active.retriever.retrieve(&question, retrieval.k).await?;
        let context = self
            .reranker
            .rerank(&question, candidates, retrieval.top_n)
            .await;

        let generated = self.answerer.answer(&question, context).await?;

        Ok(QueryResponse {
            answer: generated.answer,
            sources: generated
                .sources
                .iter()
                .map(|s| SourceChunk::from_chunk(&s.chunk, s.score))
                .collect(),
        })
    }

    /// Structured extraction over the active document's full text.
    pub async fn analyze(&self) -> Result<ExtractionReport> {
        let active = self.current()?;
        self.extractor.extract(&active.document.full_text).await
    }

    /// Entity and pattern extraction over the active document's full text.
    pub async fn extract_entities(&self) -> Result<EntityExtractionResult> {
        let active = self.current()?;
        let entities = Arc::clone(&self.entities);

        tokio::task::spawn_blocking(move || entities.extract(&active.document.full_text))
            .await
            .map_err(|e| Error::internal(format!("entity extraction task failed: {}", e)))
    }
}
