use tagsel_core::error::CoreError;

/// Errors from the tagsel REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, timeout, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("tagsel API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Rejections the server made on purpose keep their meaning; everything
/// else is a storage failure.
impl From<ClientError> for CoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ApiError { status: 400, body } => CoreError::Validation(body),
            ClientError::ApiError { status: 409, body } => CoreError::Conflict(body),
            ClientError::ApiError { status: 422, body } => CoreError::MalformedCatalog(body),
            other => CoreError::Persistence(other.to_string()),
        }
    }
}
