//! Handler for storing generated deployment files.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tagsel_core::persistence::ConfigBackend;
use tagsel_core::types::Timestamp;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileRequest {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFileResponse {
    /// Name written, after collision renaming.
    pub file_name: String,
    pub original_file_name: String,
    pub renamed: bool,
    pub file_size: u64,
    pub location: String,
    pub saved_at: Timestamp,
}

/// POST /api/v1/files
///
/// Writes the file to the configured directory (or the local fallback under
/// the data directory). An existing file with the same name is never
/// overwritten: the new file is stored as `name(n).ext`.
pub async fn save_file(
    State(state): State<AppState>,
    Json(input): Json<SaveFileRequest>,
) -> AppResult<impl IntoResponse> {
    if input.content.is_empty() {
        return Err(AppError::BadRequest("content must not be empty".to_string()));
    }

    let saved = state
        .store
        .save_generated_file(&input.file_name, &input.content)
        .await?;

    if saved.renamed {
        tracing::info!(
            requested = %input.file_name,
            stored = %saved.final_name,
            "Generated file renamed to avoid overwrite",
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SavedFileResponse {
                file_name: saved.final_name,
                original_file_name: input.file_name,
                renamed: saved.renamed,
                file_size: saved.size,
                location: saved.location,
                saved_at: Utc::now(),
            },
        }),
    ))
}
