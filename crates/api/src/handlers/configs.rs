//! Handlers for saved configs and the pinned set.
//!
//! Both are stored as whole documents: a `PUT` replaces the full list.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tagsel_core::persistence::{ConfigBackend, CONFIGS_FILE, PINNED_FILE};
use tagsel_core::repository::{ensure_unique_names, Config};
use tagsel_core::types::{ConfigId, Timestamp};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Configs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigsDocument {
    pub configs: Vec<Config>,
    /// Absent when nothing has been saved yet.
    #[serde(default, skip_deserializing)]
    pub saved_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub count: usize,
    pub saved_at: Timestamp,
}

/// GET /api/v1/configs
///
/// Returns an empty list when no configs have been saved.
pub async fn list_configs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let doc = state.store.read_document::<Vec<Config>>(CONFIGS_FILE).await?;
    let data = match doc {
        Some(doc) => ConfigsDocument {
            configs: doc.payload,
            saved_at: Some(doc.saved_at),
        },
        None => ConfigsDocument {
            configs: Vec::new(),
            saved_at: None,
        },
    };
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/configs
///
/// Replace the stored list. Rejected with 409 when two configs share a name.
pub async fn save_configs(
    State(state): State<AppState>,
    Json(input): Json<ConfigsDocument>,
) -> AppResult<impl IntoResponse> {
    ensure_unique_names(&input.configs)?;
    let saved_at = state.store.write_document(CONFIGS_FILE, &input.configs).await?;

    tracing::info!(count = input.configs.len(), "Configs stored");

    Ok(Json(DataResponse {
        data: SaveSummary {
            count: input.configs.len(),
            saved_at,
        },
    }))
}

// ---------------------------------------------------------------------------
// Pinned set
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedDocument {
    pub pinned_configs: Vec<ConfigId>,
}

/// GET /api/v1/pinned
pub async fn get_pinned(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let pinned_configs = state.store.load_pinned().await?;
    Ok(Json(DataResponse {
        data: PinnedDocument { pinned_configs },
    }))
}

/// PUT /api/v1/pinned
///
/// Duplicate ids are collapsed, keeping the first occurrence.
pub async fn save_pinned(
    State(state): State<AppState>,
    Json(input): Json<PinnedDocument>,
) -> AppResult<impl IntoResponse> {
    let mut ids: Vec<ConfigId> = Vec::with_capacity(input.pinned_configs.len());
    for id in input.pinned_configs {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    let saved_at = state.store.write_document(PINNED_FILE, &ids).await?;

    tracing::debug!(count = ids.len(), "Pinned set stored");

    Ok(Json(DataResponse {
        data: SaveSummary {
            count: ids.len(),
            saved_at,
        },
    }))
}
