//! Question answering endpoint

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

const QUESTION_FIELD: &str = "question";

fn missing_question() -> Error {
    Error::EmptyInput(format!("form field '{}' is required", QUESTION_FIELD))
}

/// Read the question from a multipart form, a urlencoded form, or JSON.
async fn read_question(state: &AppState, request: Request) -> Result<String> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| Error::EmptyInput(format!("invalid multipart body: {}", e)))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::EmptyInput(format!("invalid multipart body: {}", e)))?
        {
            if field.name() == Some(QUESTION_FIELD) {
                return field
                    .text()
                    .await
                    .map_err(|e| Error::EmptyInput(format!("unreadable question: {}", e)));
            }
        }
        Err(missing_question())
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<QueryRequest>::from_request(request, state)
            .await
            .map_err(|_| missing_question())?;
        Ok(body.question)
    } else {
        let Form(body) = Form::<QueryRequest>::from_request(request, state)
            .await
            .map_err(|_| missing_question())?;
        Ok(body.question)
    }
}

/// POST /query - Answer a question from the active document
pub async fn query_document(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    let question = read_question(&state, request).await?;

    tracing::info!("Query: {}", question.trim());

    let response = state
        .session()
        .query(&QueryRequest::new(question))
        .await?;

    tracing::info!(
        sources = response.sources.len(),
        "Query answered in {:?}",
        start.elapsed()
    );
    Ok(Json(response))
}
