//! Maintenance handlers for the data directory.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/backup
///
/// Copies the catalog and config documents into `backups/` with a
/// timestamp suffix. Documents that do not exist yet are skipped.
pub async fn create_backup(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let report = state.store.backup().await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/status
pub async fn data_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let status = state.store.status().await;
    Ok(Json(DataResponse { data: status }))
}
