//! Route definitions for saved configs and the pinned set.
//!
//! Two routers are provided:
//! - `router()` for the config list mounted at `/configs`
//! - `pinned_router()` for the pinned ids mounted at `/pinned`

use axum::routing::get;
use axum::Router;

use crate::handlers::configs;
use crate::state::AppState;

/// ```text
/// GET /  -> list_configs
/// PUT /  -> save_configs
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(configs::list_configs).put(configs::save_configs))
}

/// ```text
/// GET /  -> get_pinned
/// PUT /  -> save_pinned
/// ```
pub fn pinned_router() -> Router<AppState> {
    Router::new().route("/", get(configs::get_pinned).put(configs::save_pinned))
}
