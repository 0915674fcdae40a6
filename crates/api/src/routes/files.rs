use axum::routing::post;
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Generated file routes mounted at `/files`.
///
/// ```text
/// POST / -> save_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(files::save_file))
}
