use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{check_file_name, ConfigBackend, SavedFile, StoredDocument};
use crate::catalog::FeatureCatalog;
use crate::error::CoreError;
use crate::naming::resolve_duplicate_file_name;
use crate::repository::Config;
use crate::types::{new_id, ConfigId, Timestamp};

pub const CATALOG_FILE: &str = "current_data.json";
pub const CONFIGS_FILE: &str = "configs.json";
pub const PINNED_FILE: &str = "pinned_configs.json";
pub const GENERATED_SUBDIR: &str = "generated_configs";
pub const BACKUP_SUBDIR: &str = "backups";

/// Files copied by [`JsonFileStore::backup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub backup_files: Vec<PathBuf>,
    pub timestamp: String,
}

/// Which stored documents exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub data_directory: PathBuf,
    pub current_data_exists: bool,
    pub configs_exists: bool,
    pub pinned_exists: bool,
    pub timestamp: Timestamp,
}

/// JSON documents in a data directory.
///
/// Every document is wrapped in a [`StoredDocument`] and written through a
/// temporary file followed by a rename, so readers never see a partial file.
/// Generated deployment files go to the primary directory when it exists
/// and is writable, otherwise to `generated_configs/` under the data
/// directory.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    generated_dir: Option<PathBuf>,
    file_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            generated_dir: None,
            file_lock: Mutex::new(()),
        }
    }

    /// Set the primary directory for generated files.
    pub fn with_generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.generated_dir = Some(dir.into());
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn fallback_generated_dir(&self) -> PathBuf {
        self.data_dir.join(GENERATED_SUBDIR)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Create the data directory if needed.
    pub async fn ensure_data_dir(&self) -> Result<(), CoreError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| io_error("create data directory", &self.data_dir, e))
    }

    /// Whether a probe file can be written to the data directory.
    pub async fn is_writable(&self) -> bool {
        if self.ensure_data_dir().await.is_err() {
            return false;
        }
        let probe = self.path(".write_probe");
        let ok = tokio::fs::write(&probe, b"ok").await.is_ok();
        let _ = tokio::fs::remove_file(&probe).await;
        ok
    }

    /// Read a stored document; `Ok(None)` when the file does not exist.
    pub async fn read_document<T: DeserializeOwned>(&self, file: &str) -> Result<Option<StoredDocument<T>>, CoreError> {
        let path = self.path(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path, e)),
        };
        let doc = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::Persistence(format!("corrupt document {}: {e}", path.display())))?;
        Ok(Some(doc))
    }

    /// Write a document atomically. Returns the save timestamp.
    ///
    /// Each write stages into its own temporary file, so concurrent writers
    /// never share a staging path; the last rename wins.
    pub async fn write_document<T: Serialize + Sync>(&self, file: &str, payload: &T) -> Result<Timestamp, CoreError> {
        self.ensure_data_dir().await?;
        let saved_at = Utc::now();
        let doc = StoredDocument::new(payload, saved_at);
        let json = serde_json::to_vec_pretty(&doc).map_err(|e| CoreError::Internal(e.to_string()))?;

        let path = self.path(file);
        let tmp = self.path(&format!(".{file}.{}.tmp", new_id()));
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| io_error("write", &tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error("rename", &path, e));
        }

        tracing::debug!(path = %path.display(), bytes = json.len(), "Wrote document");
        Ok(saved_at)
    }

    pub async fn catalog_exists(&self) -> bool {
        tokio::fs::try_exists(self.path(CATALOG_FILE)).await.unwrap_or(false)
    }

    /// Remove the catalog snapshot. Returns whether one existed.
    pub async fn clear_catalog(&self) -> Result<bool, CoreError> {
        let path = self.path(CATALOG_FILE);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed catalog snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    /// Copy the catalog and config documents to `backups/` with a timestamp.
    pub async fn backup(&self) -> Result<BackupReport, CoreError> {
        let backup_dir = self.data_dir.join(BACKUP_SUBDIR);
        tokio::fs::create_dir_all(&backup_dir)
            .await
            .map_err(|e| io_error("create backup directory", &backup_dir, e))?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut backup_files = Vec::new();
        for (file, prefix) in [(CATALOG_FILE, "current_data"), (CONFIGS_FILE, "configs")] {
            let source = self.path(file);
            if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
                continue;
            }
            let target = backup_dir.join(format!("{prefix}_{timestamp}.json"));
            tokio::fs::copy(&source, &target)
                .await
                .map_err(|e| io_error("copy", &target, e))?;
            backup_files.push(target);
        }

        tracing::info!(count = backup_files.len(), "Backup complete");
        Ok(BackupReport {
            backup_files,
            timestamp,
        })
    }

    pub async fn status(&self) -> StoreStatus {
        let exists = |file: &str| {
            let path = self.path(file);
            async move { tokio::fs::try_exists(path).await.unwrap_or(false) }
        };
        StoreStatus {
            data_directory: self.data_dir.clone(),
            current_data_exists: exists(CATALOG_FILE).await,
            configs_exists: exists(CONFIGS_FILE).await,
            pinned_exists: exists(PINNED_FILE).await,
            timestamp: Utc::now(),
        }
    }

    async fn usable_primary_dir(&self) -> Option<&Path> {
        let dir = self.generated_dir.as_deref()?;
        match tokio::fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Some(dir),
            _ => {
                tracing::warn!(dir = %dir.display(), "Generated file directory unavailable, using local fallback");
                None
            }
        }
    }

    async fn write_generated(&self, dir: &Path, name: &str, content: &str) -> Result<(String, bool), CoreError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_error("create directory", dir, e))?;

        let mut existing = Vec::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| io_error("list", dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error("list", dir, e))? {
            existing.push(entry.file_name().to_string_lossy().into_owned());
        }

        let final_name = resolve_duplicate_file_name(name, |n| existing.iter().any(|e| e == n));
        let path = dir.join(&final_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| io_error("write", &path, e))?;
        let renamed = final_name != name;
        Ok((final_name, renamed))
    }
}

#[async_trait]
impl ConfigBackend for JsonFileStore {
    fn label(&self) -> &'static str {
        "file"
    }

    async fn load_configs(&self) -> Result<Vec<Config>, CoreError> {
        Ok(self
            .read_document::<Vec<Config>>(CONFIGS_FILE)
            .await?
            .map(|doc| doc.payload)
            .unwrap_or_default())
    }

    async fn save_configs(&self, configs: &[Config]) -> Result<(), CoreError> {
        self.write_document(CONFIGS_FILE, &configs).await?;
        tracing::info!(count = configs.len(), "Saved configs");
        Ok(())
    }

    async fn load_pinned(&self) -> Result<Vec<ConfigId>, CoreError> {
        Ok(self
            .read_document::<Vec<ConfigId>>(PINNED_FILE)
            .await?
            .map(|doc| doc.payload)
            .unwrap_or_default())
    }

    async fn save_pinned(&self, ids: &[ConfigId]) -> Result<(), CoreError> {
        self.write_document(PINNED_FILE, &ids).await?;
        Ok(())
    }

    async fn load_catalog_snapshot(&self) -> Result<Option<FeatureCatalog>, CoreError> {
        let Some(doc) = self.read_document::<serde_json::Value>(CATALOG_FILE).await? else {
            return Ok(None);
        };
        FeatureCatalog::from_value(doc.payload).map(Some)
    }

    async fn save_catalog_snapshot(&self, catalog: &FeatureCatalog) -> Result<(), CoreError> {
        catalog.validate()?;
        self.write_document(CATALOG_FILE, catalog).await?;
        tracing::info!(groups = catalog.feature_groups.len(), "Saved catalog snapshot");
        Ok(())
    }

    async fn save_generated_file(&self, name: &str, content: &str) -> Result<SavedFile, CoreError> {
        check_file_name(name)?;
        let name = name.trim();
        let _guard = self.file_lock.lock().await;

        if let Some(primary) = self.usable_primary_dir().await {
            match self.write_generated(primary, name, content).await {
                Ok((final_name, renamed)) => {
                    tracing::info!(file = %final_name, dir = %primary.display(), "Saved generated file");
                    return Ok(SavedFile {
                        final_name,
                        renamed,
                        size: content.len() as u64,
                        location: format!("server path: {}", primary.display()),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Primary directory write failed, using local fallback");
                }
            }
        }

        let fallback = self.fallback_generated_dir();
        let (final_name, renamed) = self.write_generated(&fallback, name, content).await?;
        tracing::info!(file = %final_name, dir = %fallback.display(), "Saved generated file to local fallback");
        Ok(SavedFile {
            final_name,
            renamed,
            size: content.len() as u64,
            location: format!("local fallback path: {}", fallback.display()),
        })
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> CoreError {
    CoreError::Persistence(format!("failed to {action} {}: {err}", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data"));
        (dir, store)
    }

    #[tokio::test]
    async fn missing_documents_read_as_empty() {
        let (_dir, store) = store();
        assert!(store.load_configs().await.unwrap().is_empty());
        assert!(store.load_pinned().await.unwrap().is_empty());
        assert!(store.load_catalog_snapshot().await.unwrap().is_none());
        assert!(!store.catalog_exists().await);
    }

    #[tokio::test]
    async fn configs_round_trip_with_envelope() {
        let (_dir, store) = store();
        let configs = vec![Config::new("nightly", "", Vec::new())];
        store.save_configs(&configs).await.unwrap();

        let loaded = store.load_configs().await.unwrap();
        assert_eq!(loaded, configs);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.data_dir().join(CONFIGS_FILE)).unwrap()).unwrap();
        assert_eq!(raw["version"], "1.0");
        assert_eq!(raw["payload"][0]["name"], "nightly");
    }

    #[tokio::test]
    async fn catalog_snapshot_lifecycle() {
        let (_dir, store) = store();
        let catalog = FeatureCatalog::builtin();
        store.save_catalog_snapshot(&catalog).await.unwrap();
        assert!(store.catalog_exists().await);
        assert_eq!(store.load_catalog_snapshot().await.unwrap(), Some(catalog));

        assert!(store.clear_catalog().await.unwrap());
        assert!(!store.clear_catalog().await.unwrap());
        assert!(!store.catalog_exists().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_all_succeed() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let mut tasks = Vec::new();
        for task in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut failures = 0;
                for round in 0..20 {
                    let configs = vec![Config::new(format!("t{task}-r{round}"), "", Vec::new())];
                    if store.write_document(CONFIGS_FILE, &configs).await.is_err() {
                        failures += 1;
                    }
                }
                failures
            }));
        }

        let mut failures = 0;
        for task in tasks {
            failures += task.await.unwrap();
        }
        assert_eq!(failures, 0);

        let loaded = store.load_configs().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let leftovers = std::fs::read_dir(store.data_dir())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn corrupt_document_is_a_persistence_error() {
        let (_dir, store) = store();
        store.ensure_data_dir().await.unwrap();
        std::fs::write(store.data_dir().join(CONFIGS_FILE), b"{ nope").unwrap();
        assert_matches!(store.load_configs().await, Err(CoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn generated_files_fall_back_and_rename() {
        let (dir, store) = store();
        let store = store.with_generated_dir(dir.path().join("missing-share"));

        let first = store.save_generated_file("104.txt", "ftp_path: /x\n").await.unwrap();
        assert_eq!(first.final_name, "104.txt");
        assert!(first.location.starts_with("local fallback path"));
        assert_eq!(first.size, 13);

        let second = store.save_generated_file("104.txt", "ftp_path: /y\n").await.unwrap();
        assert_eq!(second.final_name, "104(1).txt");
        assert!(second.renamed);
        assert!(store.fallback_generated_dir().join("104(1).txt").exists());
    }

    #[tokio::test]
    async fn generated_files_use_primary_dir_when_present() {
        let (dir, store) = store();
        let share = dir.path().join("share");
        std::fs::create_dir_all(&share).unwrap();
        let store = store.with_generated_dir(&share);

        let saved = store.save_generated_file("ces.txt", "x").await.unwrap();
        assert!(saved.location.starts_with("server path"));
        assert!(share.join("ces.txt").exists());
    }

    #[tokio::test]
    async fn backup_copies_existing_documents() {
        let (_dir, store) = store();
        store.save_configs(&[]).await.unwrap();
        let report = store.backup().await.unwrap();
        assert_eq!(report.backup_files.len(), 1);
        assert!(report.backup_files[0].exists());

        let status = store.status().await;
        assert!(status.configs_exists);
        assert!(!status.current_data_exists);
    }
}
