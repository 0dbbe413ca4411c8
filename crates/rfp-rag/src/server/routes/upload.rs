//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// POST /upload - Store a file and make it the active document
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Internal(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::UnsupportedFileType("upload has no file name".into()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Internal(format!("Failed to read file: {}", e)))?;

        tracing::info!("Received upload: {} ({} bytes)", filename, data.len());

        let response = state.session().load(&filename, data.to_vec()).await?;

        tracing::info!(
            "Upload of '{}' finished in {:?}",
            response.filename,
            start.elapsed()
        );
        return Ok(Json(response));
    }

    Err(Error::Internal(format!(
        "No '{}' field in upload request",
        FILE_FIELD
    )))
}
