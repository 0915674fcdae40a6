//! Handlers for the stored catalog snapshot.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tagsel_core::catalog::FeatureCatalog;
use tagsel_core::error::CoreError;
use tagsel_core::persistence::{ConfigBackend, CATALOG_FILE};
use tagsel_core::types::Timestamp;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PUT /catalog`. The payload is kept as raw JSON so structural
/// problems surface as a malformed-catalog error instead of a generic
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SaveCatalogRequest {
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAt {
    pub saved_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct CatalogExists {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct CatalogDeleted {
    pub deleted: bool,
}

/// Summary of the stored snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInfo {
    pub source: Option<String>,
    pub saved_at: Timestamp,
    pub group_count: usize,
    pub feature_count: usize,
    pub sub_feature_count: usize,
    pub test_levels: Vec<String>,
}

fn no_catalog() -> CoreError {
    CoreError::NotFound {
        entity: "Catalog",
        id: "current".to_string(),
    }
}

/// GET /api/v1/catalog
pub async fn get_catalog(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let catalog = state.store.load_catalog_snapshot().await?.ok_or_else(no_catalog)?;
    Ok(Json(DataResponse { data: catalog }))
}

/// PUT /api/v1/catalog
///
/// Validates the catalog before anything is written; a malformed catalog
/// leaves the stored snapshot untouched.
pub async fn save_catalog(
    State(state): State<AppState>,
    Json(input): Json<SaveCatalogRequest>,
) -> AppResult<impl IntoResponse> {
    let catalog = FeatureCatalog::from_value(input.data)?;
    let saved_at = state.store.write_document(CATALOG_FILE, &catalog).await?;

    tracing::info!(
        groups = catalog.feature_groups.len(),
        source = catalog.source.as_deref().unwrap_or("unknown"),
        "Catalog snapshot stored",
    );

    Ok(Json(DataResponse {
        data: SavedAt { saved_at },
    }))
}

/// DELETE /api/v1/catalog
pub async fn delete_catalog(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let deleted = state.store.clear_catalog().await?;
    Ok(Json(DataResponse {
        data: CatalogDeleted { deleted },
    }))
}

/// GET /api/v1/catalog/exists
pub async fn catalog_exists(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let exists = state.store.catalog_exists().await;
    Ok(Json(DataResponse {
        data: CatalogExists { exists },
    }))
}

/// GET /api/v1/catalog/info
pub async fn catalog_info(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let doc = state
        .store
        .read_document::<serde_json::Value>(CATALOG_FILE)
        .await?
        .ok_or_else(no_catalog)?;
    let catalog = FeatureCatalog::from_value(doc.payload)?;
    let stats = catalog.statistics();

    Ok(Json(DataResponse {
        data: CatalogInfo {
            source: catalog.source.clone(),
            saved_at: doc.saved_at,
            group_count: stats.group_count,
            feature_count: stats.feature_count,
            sub_feature_count: stats.sub_feature_count,
            test_levels: catalog
                .effective_test_levels()
                .into_iter()
                .map(str::to_string)
                .collect(),
        },
    }))
}
