//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. The HTTP client in
//! `tagsel-client` unwraps the same shape.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: configs }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
