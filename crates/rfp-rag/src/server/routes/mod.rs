//! API routes for the RFP RAG server

pub mod analysis;
pub mod query;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload replaces the active document; larger body limit for files
        .route(
            "/upload",
            post(upload::upload_file)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_size)),
        )
        .route("/query", post(query::query_document))
        .route("/analyze-rfp-details", get(analysis::analyze_rfp_details))
        .route("/extract-entities", get(analysis::extract_entities))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let session = state.session();
    let document = session.active().map(|active| {
        serde_json::json!({
            "metadata": active.document,
            "chunks": active.retriever.chunk_count(),
            "lexical_index": active.retriever.lexical_available(),
        })
    });

    Json(serde_json::json!({
        "name": "rfp-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Hybrid retrieval and structured extraction for RFP documents",
        "endpoints": {
            "POST /upload": "Upload a .txt, .md or .pdf file and make it the active document",
            "POST /query": "Ask a question about the active document (form field 'question')",
            "GET /analyze-rfp-details": "Structured RFP details extracted by the model",
            "GET /extract-entities": "Dates, organizations, certifications and other entities"
        },
        "status": {
            "ready": session.is_ready(),
            "loading": session.is_loading(),
            "rerank": session.rerank_mode(),
            "answer_model": session.answer_model(),
            "document": document,
        }
    }))
}
