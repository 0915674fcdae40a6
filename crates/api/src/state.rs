use std::sync::Arc;

use tagsel_core::persistence::JsonFileStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// JSON document store rooted at the data directory.
    pub store: Arc<JsonFileStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let mut store = JsonFileStore::new(config.data_dir.clone());
        if let Some(dir) = &config.generated_dir {
            store = store.with_generated_dir(dir.clone());
        }
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}
