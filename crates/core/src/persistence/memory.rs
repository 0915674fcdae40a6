use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use super::{check_file_name, ConfigBackend, SavedFile};
use crate::catalog::FeatureCatalog;
use crate::error::CoreError;
use crate::naming::resolve_duplicate_file_name;
use crate::repository::Config;
use crate::types::ConfigId;

#[derive(Debug, Default)]
struct MemoryState {
    configs: Vec<Config>,
    pinned: Vec<ConfigId>,
    catalog: Option<FeatureCatalog>,
    files: IndexMap<String, String>,
}

/// In-process backend. Can be switched offline to make every call fail.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Generated files stored so far, by final name.
    pub async fn files(&self) -> IndexMap<String, String> {
        self.state.lock().await.files.clone()
    }

    fn ensure_online(&self) -> Result<(), CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Persistence("memory backend is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigBackend for MemoryBackend {
    fn label(&self) -> &'static str {
        "memory"
    }

    async fn load_configs(&self) -> Result<Vec<Config>, CoreError> {
        self.ensure_online()?;
        Ok(self.state.lock().await.configs.clone())
    }

    async fn save_configs(&self, configs: &[Config]) -> Result<(), CoreError> {
        self.ensure_online()?;
        self.state.lock().await.configs = configs.to_vec();
        Ok(())
    }

    async fn load_pinned(&self) -> Result<Vec<ConfigId>, CoreError> {
        self.ensure_online()?;
        Ok(self.state.lock().await.pinned.clone())
    }

    async fn save_pinned(&self, ids: &[ConfigId]) -> Result<(), CoreError> {
        self.ensure_online()?;
        self.state.lock().await.pinned = ids.to_vec();
        Ok(())
    }

    async fn load_catalog_snapshot(&self) -> Result<Option<FeatureCatalog>, CoreError> {
        self.ensure_online()?;
        Ok(self.state.lock().await.catalog.clone())
    }

    async fn save_catalog_snapshot(&self, catalog: &FeatureCatalog) -> Result<(), CoreError> {
        self.ensure_online()?;
        self.state.lock().await.catalog = Some(catalog.clone());
        Ok(())
    }

    async fn save_generated_file(&self, name: &str, content: &str) -> Result<SavedFile, CoreError> {
        self.ensure_online()?;
        check_file_name(name)?;
        let mut state = self.state.lock().await;
        let final_name = resolve_duplicate_file_name(name, |n| state.files.contains_key(n));
        state.files.insert(final_name.clone(), content.to_string());
        Ok(SavedFile {
            renamed: final_name != name,
            final_name,
            size: content.len() as u64,
            location: "memory".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn stores_and_renames_files() {
        let backend = MemoryBackend::new();
        let first = backend.save_generated_file("ces.txt", "a").await.unwrap();
        let second = backend.save_generated_file("ces.txt", "bb").await.unwrap();
        assert!(!first.renamed);
        assert_eq!(second.final_name, "ces(1).txt");
        assert_eq!(second.size, 2);
        assert_eq!(backend.files().await.len(), 2);
    }

    #[tokio::test]
    async fn offline_fails_every_call() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert_matches!(backend.load_configs().await, Err(CoreError::Persistence(_)));
        assert_matches!(backend.save_pinned(&[]).await, Err(CoreError::Persistence(_)));
        backend.set_offline(false);
        assert!(backend.load_catalog_snapshot().await.unwrap().is_none());
    }
}
