//! Error types for the RFP RAG service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload extension not recognized
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Load produced no text
    #[error("Document '{0}' contains no extractable text")]
    EmptyDocument(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Query or extraction before a document has been loaded
    #[error("{0}")]
    NotReady(String),

    /// Generative model or rerank service unreachable
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream call exceeded its deadline
    #[error("Upstream call timed out: {0}")]
    UpstreamTimeout(String),

    /// Model output was not valid JSON
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Model output was JSON but did not fit the extraction schema
    #[error("Model output does not match schema: {0}")]
    SchemaMismatch(String),

    /// Extraction invoked with no text, or an empty question
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Every extraction chunk failed
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a not-ready error
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady(message.into())
    }

    /// Create an upstream-unavailable error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify a reqwest failure as a timeout or an unreachable upstream.
    pub fn from_upstream(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout(format!("{}: {}", service, err))
        } else {
            Self::UpstreamUnavailable(format!("{}: {}", service, err))
        }
    }

    /// Short machine-readable kind, used in response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::UnsupportedFileType(_) => "unsupported_file_type",
            Error::EmptyDocument(_) => "empty_document",
            Error::FileParse { .. } => "parse_error",
            Error::NotReady(_) => "not_ready",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::UpstreamTimeout(_) => "upstream_timeout",
            Error::MalformedOutput(_) => "malformed_output",
            Error::SchemaMismatch(_) => "schema_mismatch",
            Error::EmptyInput(_) => "empty_input",
            Error::ExtractionFailed(_) => "extraction_failed",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    ///
    /// Only caller mistakes map to 400; everything else, upload failures
    /// included, is reported as 500.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotReady(_) | Error::EmptyInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
