//! Configuration for the RFP RAG service
//!
//! Values come from, in order of increasing precedence: built-in defaults,
//! an optional TOML file named by `RFP_RAG_CONFIG`, and environment
//! variables (a `.env` file in the working directory is honored).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Upload storage
    pub storage: StorageConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking used for the retrieval indices
    pub retrieval_chunking: ChunkingConfig,
    /// Chunking used for structured extraction
    pub extraction_chunking: ChunkingConfig,
    /// Fusion retrieval settings
    pub retrieval: RetrievalConfig,
    /// Optional rerank service
    pub rerank: RerankConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Structured extraction settings
    pub extraction: ExtractionConfig,
}

impl RagConfig {
    /// Load configuration from `.env`, an optional TOML file, and the environment.
    pub fn load() -> Result<Self> {
        // Missing .env is normal
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var("RFP_RAG_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.llm.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("RAG_LLM_MODEL") {
            self.llm.answer_model = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.llm.extraction_model = v;
        }
        if let Some(v) = get("OLLAMA_EMBED_MODEL") {
            self.embeddings.model = v;
        }
        if let Some(v) = get("COHERE_API_KEY") {
            self.rerank.api_key = Some(v);
        }
        if let Some(v) = get("RERANK_ENDPOINT") {
            self.rerank.endpoint = v;
        }
        if let Some(v) = get("RERANK_MODEL") {
            self.rerank.model = v;
        }
        if let Some(v) = get("RFP_RAG_UPLOAD_DIR") {
            self.storage.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = get("RFP_RAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("RFP_RAG_PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| Error::Config(format!("RFP_RAG_PORT is not a port: {}", v)))?;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.retrieval_chunking.validate("retrieval_chunking")?;
        self.extraction_chunking.validate("extraction_chunking")?;

        let r = &self.retrieval;
        if r.k == 0 || r.top_n == 0 {
            return Err(Error::Config("retrieval.k and retrieval.top_n must be > 0".into()));
        }
        if r.semantic_weight < 0.0 || r.lexical_weight < 0.0 {
            return Err(Error::Config("fusion weights must be non-negative".into()));
        }
        if r.semantic_weight + r.lexical_weight <= 0.0 {
            return Err(Error::Config("at least one fusion weight must be positive".into()));
        }
        if self.extraction.max_concurrency == 0 {
            return Err(Error::Config("extraction.max_concurrency must be > 0".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Where uploaded files are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama embedding model
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Concurrent embedding requests during index build
    pub parallelism: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            parallelism: 4,
        }
    }
}

/// Recursive splitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Separators tried in order; the empty string means per-character
    pub separators: Vec<String>,
}

impl ChunkingConfig {
    /// Small chunks for the retrieval indices.
    pub fn retrieval() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            separators: ["\n\n", "\n", " ", ""].map(String::from).to_vec(),
        }
    }

    /// Large chunks for structured extraction.
    pub fn extraction() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
            separators: ["\n\n", "\n", ". ", ", ", " ", ""].map(String::from).to_vec(),
        }
    }

    fn validate(&self, section: &str) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config(format!("{}.chunk_size must be > 0", section)));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "{}.chunk_overlap ({}) must be smaller than chunk_size ({})",
                section, self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Fusion retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from each index
    pub k: usize,
    /// Weight of the normalized semantic score
    pub semantic_weight: f32,
    /// Weight of the normalized lexical score
    pub lexical_weight: f32,
    /// Chunks kept after reranking and handed to the answer prompt
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            semantic_weight: 0.8,
            lexical_weight: 0.2,
            top_n: 5,
        }
    }
}

/// Cohere-compatible rerank service. Without an API key reranking is a pass-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cohere.com/v1/rerank".to_string(),
            model: "rerank-english-v3.0".to_string(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Model used to answer questions
    pub answer_model: String,
    /// Model used for structured extraction
    pub extraction_model: String,
    /// Sampling temperature for answers
    pub answer_temperature: f32,
    /// Sampling temperature for extraction
    pub extraction_temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            answer_model: "mistral".to_string(),
            extraction_model: "phi3:mini".to_string(),
            answer_temperature: 0.3,
            extraction_temperature: 0.1,
            timeout_secs: 120,
            max_retries: 1,
        }
    }
}

/// Structured extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Per-chunk model calls in flight at once
    pub max_concurrency: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { max_concurrency: 2 }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embeddings: EmbeddingConfig::default(),
            retrieval_chunking: ChunkingConfig::retrieval(),
            extraction_chunking: ChunkingConfig::extraction(),
            retrieval: RetrievalConfig::default(),
            rerank: RerankConfig::default(),
            llm: LlmConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}
