//! Route definitions for the catalog snapshot.

use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// Catalog routes mounted at `/catalog`.
///
/// ```text
/// GET    /        -> get_catalog
/// PUT    /        -> save_catalog
/// DELETE /        -> delete_catalog
/// GET    /exists  -> catalog_exists
/// GET    /info    -> catalog_info
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(catalog::get_catalog)
                .put(catalog::save_catalog)
                .delete(catalog::delete_catalog),
        )
        .route("/exists", get(catalog::catalog_exists))
        .route("/info", get(catalog::catalog_info))
}
