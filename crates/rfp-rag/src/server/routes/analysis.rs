//! Structured extraction and entity endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{EntityExtractionResult, MergedExtraction};

/// GET /analyze-rfp-details - Structured details of the active document
pub async fn analyze_rfp_details(State(state): State<AppState>) -> Result<Json<MergedExtraction>> {
    let report = state.session().analyze().await?;

    tracing::info!(
        "RFP analysis used {}/{} chunks",
        report.parsed_count(),
        report.chunks.len()
    );
    Ok(Json(report.merged))
}

/// GET /extract-entities - Entities and RFP phrases in the active document
pub async fn extract_entities(
    State(state): State<AppState>,
) -> Result<Json<EntityExtractionResult>> {
    let entities = state.session().extract_entities().await?;
    Ok(Json(entities))
}
