//! HTTP client for the tagsel persistence server.
//!
//! [`HttpBackend`] implements the core `ConfigBackend` trait over the
//! server's REST API. [`connect`] pairs it with a local JSON cache so reads
//! survive an unreachable server.

pub mod api;
pub mod config;
pub mod error;

pub use api::HttpBackend;
pub use config::ClientConfig;
pub use error::ClientError;

use tagsel_core::persistence::{FallbackStore, JsonFileStore};

/// Remote store backed by the server with a local last-known-good cache.
pub type ClientStore = FallbackStore<HttpBackend, JsonFileStore>;

/// Build the remote-first store described by `config`.
pub fn connect(config: &ClientConfig) -> Result<ClientStore, ClientError> {
    let remote = HttpBackend::from_config(config)?;
    let local = JsonFileStore::new(config.cache_dir.clone());
    tracing::debug!(
        api_url = %config.api_url,
        cache_dir = %config.cache_dir.display(),
        "Connecting remote store with local cache",
    );
    Ok(FallbackStore::new(remote, local))
}
