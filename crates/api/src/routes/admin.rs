use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Maintenance routes, merged at the `/api/v1` root.
///
/// ```text
/// POST /backup -> create_backup
/// GET  /status -> data_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/backup", post(admin::create_backup))
        .route("/status", get(admin::data_status))
}
