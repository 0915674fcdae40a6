pub mod admin;
pub mod catalog;
pub mod configs;
pub mod files;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /catalog                 get, save (PUT), delete
/// /catalog/exists          whether a snapshot is stored
/// /catalog/info            snapshot summary
///
/// /configs                 list, replace (PUT)
/// /pinned                  get, replace (PUT)
///
/// /files                   store a generated file (POST)
///
/// /backup                  copy documents to backups/ (POST)
/// /status                  data directory status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/catalog", catalog::router())
        .nest("/configs", configs::router())
        .nest("/pinned", configs::pinned_router())
        .nest("/files", files::router())
        .merge(admin::router())
}
