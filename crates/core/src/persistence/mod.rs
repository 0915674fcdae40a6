//! Persistence collaborators.
//!
//! [`ConfigBackend`] is the storage seam: the API server implements it on
//! JSON files ([`JsonFileStore`]), the client on HTTP, tests in memory
//! ([`MemoryBackend`]). [`FallbackStore`] pairs a remote backend with a
//! local one and degrades reads to the local copy when the remote fails.

mod fallback;
mod file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::FeatureCatalog;
use crate::error::CoreError;
use crate::repository::Config;
use crate::types::{ConfigId, Timestamp};

pub use fallback::{BatchSaveReport, BatchStatus, FallbackStore, FileSaveResult};
pub use file::{BackupReport, JsonFileStore, StoreStatus, CATALOG_FILE, CONFIGS_FILE, PINNED_FILE};
pub use memory::MemoryBackend;

/// Version written into every stored document.
pub const STORE_VERSION: &str = "1.0";

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Remote,
    Local,
}

/// A value together with the source it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub source: DataSource,
}

/// How a write through [`FallbackStore`] landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored remotely (and mirrored locally).
    Remote,
    /// The remote write failed; only the local copy was updated.
    LocalFallback { reason: String },
}

impl SaveOutcome {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote)
    }
}

/// Result of storing one generated deployment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFile {
    /// Name actually written, after collision renaming.
    pub final_name: String,
    pub renamed: bool,
    /// Bytes written.
    pub size: u64,
    /// Human-readable description of where the file went.
    pub location: String,
}

/// A stored payload with its save metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument<T> {
    pub payload: T,
    pub saved_at: Timestamp,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    STORE_VERSION.to_string()
}

impl<T> StoredDocument<T> {
    pub fn new(payload: T, saved_at: Timestamp) -> Self {
        Self {
            payload,
            saved_at,
            version: STORE_VERSION.to_string(),
        }
    }
}

/// Key-value style storage for configs, the pinned set, the catalog
/// snapshot and generated files.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &'static str;

    async fn load_configs(&self) -> Result<Vec<Config>, CoreError>;

    async fn save_configs(&self, configs: &[Config]) -> Result<(), CoreError>;

    async fn load_pinned(&self) -> Result<Vec<ConfigId>, CoreError>;

    async fn save_pinned(&self, ids: &[ConfigId]) -> Result<(), CoreError>;

    /// `Ok(None)` when no snapshot has been stored.
    async fn load_catalog_snapshot(&self) -> Result<Option<FeatureCatalog>, CoreError>;

    async fn save_catalog_snapshot(&self, catalog: &FeatureCatalog) -> Result<(), CoreError>;

    /// Store a generated file, renaming on collision.
    async fn save_generated_file(&self, name: &str, content: &str) -> Result<SavedFile, CoreError>;
}

/// Reject names that would escape the target directory.
pub fn check_file_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("file name must not be empty".to_string()));
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!("invalid file name '{name}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn file_name_checks() {
        assert!(check_file_name("104.txt").is_ok());
        assert_matches!(check_file_name(""), Err(CoreError::Validation(_)));
        assert_matches!(check_file_name("../etc/passwd"), Err(CoreError::Validation(_)));
        assert_matches!(check_file_name(".."), Err(CoreError::Validation(_)));
    }

    #[test]
    fn stored_document_shape() {
        let doc = StoredDocument::new(vec![1, 2], chrono::Utc::now());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["version"], "1.0");
        assert!(json.get("savedAt").is_some());
        assert_eq!(json["payload"], serde_json::json!([1, 2]));
    }
}
