//! Remote-first storage with a local last-known-good copy.
//!
//! Reads try the remote backend and fall back to the local one. Writes go
//! to both; a failed remote write still lands locally and is reported so
//! the caller can retry. The two sides are not reconciled: whichever wrote
//! last wins, and the local copy can drift from the remote store while the
//! remote is unreachable.

use serde::Serialize;

use super::{ConfigBackend, DataSource, Loaded, SaveOutcome};
use crate::catalog::FeatureCatalog;
use crate::deployment::GeneratedFile;
use crate::error::CoreError;
use crate::repository::{Config, ConfigRepository};
use crate::types::ConfigId;

/// Per-file result of a batch save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSaveResult {
    pub requested_name: String,
    pub final_name: Option<String>,
    pub renamed: bool,
    pub size: Option<u64>,
    pub location: Option<String>,
    pub error: Option<String>,
}

impl FileSaveResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Partial,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSaveReport {
    pub status: BatchStatus,
    pub results: Vec<FileSaveResult>,
}

impl BatchSaveReport {
    pub fn from_results(results: Vec<FileSaveResult>) -> Self {
        let ok = results.iter().filter(|r| r.succeeded()).count();
        let status = if ok == results.len() {
            BatchStatus::Success
        } else if ok == 0 {
            BatchStatus::Failure
        } else {
            BatchStatus::Partial
        };
        Self { status, results }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }
}

pub struct FallbackStore<R, L> {
    remote: R,
    local: L,
}

impl<R: ConfigBackend, L: ConfigBackend> FallbackStore<R, L> {
    pub fn new(remote: R, local: L) -> Self {
        Self { remote, local }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub async fn load_configs(&self) -> Result<Loaded<Vec<Config>>, CoreError> {
        match self.remote.load_configs().await {
            Ok(configs) => {
                if let Err(e) = self.local.save_configs(&configs).await {
                    tracing::warn!(error = %e, "Failed to refresh local config cache");
                }
                Ok(Loaded {
                    value: configs,
                    source: DataSource::Remote,
                })
            }
            Err(remote_err) => {
                tracing::warn!(backend = self.remote.label(), error = %remote_err, "Loading configs from local cache");
                let configs = self
                    .local
                    .load_configs()
                    .await
                    .map_err(|local_err| both_failed("load configs", &remote_err, &local_err))?;
                Ok(Loaded {
                    value: configs,
                    source: DataSource::Local,
                })
            }
        }
    }

    pub async fn save_configs(&self, configs: &[Config]) -> Result<SaveOutcome, CoreError> {
        let remote = self.remote.save_configs(configs).await;
        let local = self.local.save_configs(configs).await;
        settle("save configs", remote, local)
    }

    pub async fn load_pinned(&self) -> Result<Loaded<Vec<ConfigId>>, CoreError> {
        match self.remote.load_pinned().await {
            Ok(ids) => {
                if let Err(e) = self.local.save_pinned(&ids).await {
                    tracing::warn!(error = %e, "Failed to refresh local pinned cache");
                }
                Ok(Loaded {
                    value: ids,
                    source: DataSource::Remote,
                })
            }
            Err(remote_err) => {
                tracing::warn!(backend = self.remote.label(), error = %remote_err, "Loading pinned configs from local cache");
                let ids = self
                    .local
                    .load_pinned()
                    .await
                    .map_err(|local_err| both_failed("load pinned configs", &remote_err, &local_err))?;
                Ok(Loaded {
                    value: ids,
                    source: DataSource::Local,
                })
            }
        }
    }

    pub async fn save_pinned(&self, ids: &[ConfigId]) -> Result<SaveOutcome, CoreError> {
        let remote = self.remote.save_pinned(ids).await;
        let local = self.local.save_pinned(ids).await;
        settle("save pinned configs", remote, local)
    }

    /// Remote snapshot if there is one, else the local copy. A remote
    /// snapshot that fails validation counts as a remote failure.
    pub async fn load_catalog_snapshot(&self) -> Result<Loaded<Option<FeatureCatalog>>, CoreError> {
        match validated(self.remote.load_catalog_snapshot().await) {
            Ok(Some(catalog)) => {
                if let Err(e) = self.local.save_catalog_snapshot(&catalog).await {
                    tracing::warn!(error = %e, "Failed to refresh local catalog cache");
                }
                Ok(Loaded {
                    value: Some(catalog),
                    source: DataSource::Remote,
                })
            }
            Ok(None) => Ok(Loaded {
                value: validated(self.local.load_catalog_snapshot().await).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Ignoring unreadable local catalog cache");
                    None
                }),
                source: DataSource::Local,
            }),
            Err(remote_err) => {
                tracing::warn!(backend = self.remote.label(), error = %remote_err, "Loading catalog from local cache");
                let catalog = validated(self.local.load_catalog_snapshot().await).map_err(|local_err| both_failed("load catalog", &remote_err, &local_err))?;
                Ok(Loaded {
                    value: catalog,
                    source: DataSource::Local,
                })
            }
        }
    }

    pub async fn save_catalog_snapshot(&self, catalog: &FeatureCatalog) -> Result<SaveOutcome, CoreError> {
        catalog.validate()?;
        let remote = self.remote.save_catalog_snapshot(catalog).await;
        let local = self.local.save_catalog_snapshot(catalog).await;
        settle("save catalog", remote, local)
    }

    /// Configs and pinned ids as a repository; stale pins are dropped.
    ///
    /// The reported source is `Local` if either part came from the cache.
    pub async fn load_repository(&self) -> Result<Loaded<ConfigRepository>, CoreError> {
        let configs = self.load_configs().await?;
        let pinned = self.load_pinned().await?;
        let source = if configs.source == DataSource::Remote && pinned.source == DataSource::Remote {
            DataSource::Remote
        } else {
            DataSource::Local
        };
        Ok(Loaded {
            value: ConfigRepository::from_parts(configs.value, pinned.value),
            source,
        })
    }

    /// Save configs and pinned ids; the worse of the two outcomes is returned.
    pub async fn save_repository(&self, repo: &ConfigRepository) -> Result<SaveOutcome, CoreError> {
        let configs = self.save_configs(repo.configs()).await?;
        let pinned = self.save_pinned(repo.pinned().ids()).await?;
        Ok(match (configs, pinned) {
            (SaveOutcome::Remote, SaveOutcome::Remote) => SaveOutcome::Remote,
            (SaveOutcome::LocalFallback { reason }, _) | (_, SaveOutcome::LocalFallback { reason }) => {
                SaveOutcome::LocalFallback { reason }
            }
        })
    }

    /// Store generated files on the remote only, one at a time.
    ///
    /// Each file succeeds or fails on its own; nothing is rolled back. An
    /// empty batch is rejected.
    pub async fn save_generated_files(&self, files: &[GeneratedFile]) -> Result<BatchSaveReport, CoreError> {
        if files.is_empty() {
            return Err(CoreError::Validation("no generated files to save".to_string()));
        }
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = match self.remote.save_generated_file(&file.file_name, &file.content).await {
                Ok(saved) => FileSaveResult {
                    requested_name: file.requested_name.clone(),
                    renamed: saved.renamed || file.renamed,
                    final_name: Some(saved.final_name),
                    size: Some(saved.size),
                    location: Some(saved.location),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(file = %file.file_name, error = %e, "Failed to save generated file");
                    FileSaveResult {
                        requested_name: file.requested_name.clone(),
                        final_name: None,
                        renamed: false,
                        size: None,
                        location: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }
        let report = BatchSaveReport::from_results(results);
        tracing::info!(status = ?report.status, saved = report.succeeded(), total = files.len(), "Generated file batch finished");
        Ok(report)
    }
}

fn settle(
    action: &str,
    remote: Result<(), CoreError>,
    local: Result<(), CoreError>,
) -> Result<SaveOutcome, CoreError> {
    match (remote, local) {
        (Ok(()), Ok(())) => Ok(SaveOutcome::Remote),
        (Ok(()), Err(local_err)) => {
            tracing::warn!(action, error = %local_err, "Local mirror write failed");
            Ok(SaveOutcome::Remote)
        }
        (Err(remote_err), Ok(())) => {
            tracing::warn!(action, error = %remote_err, "Remote write failed, kept local copy");
            Ok(SaveOutcome::LocalFallback {
                reason: remote_err.to_string(),
            })
        }
        (Err(remote_err), Err(local_err)) => Err(both_failed(action, &remote_err, &local_err)),
    }
}

fn validated(loaded: Result<Option<FeatureCatalog>, CoreError>) -> Result<Option<FeatureCatalog>, CoreError> {
    if let Ok(Some(catalog)) = &loaded {
        catalog.validate()?;
    }
    loaded
}

fn both_failed(action: &str, remote: &CoreError, local: &CoreError) -> CoreError {
    CoreError::Persistence(format!("{action} failed remotely ({remote}) and locally ({local})"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::catalog::{FeatureGroup, FeatureNode, TestLevelEntry, CI_NIGHT};
    use crate::deployment::{generate_files, DeploymentForm};
    use crate::persistence::MemoryBackend;

    fn store() -> FallbackStore<MemoryBackend, MemoryBackend> {
        FallbackStore::new(MemoryBackend::new(), MemoryBackend::new())
    }

    #[tokio::test]
    async fn remote_read_refreshes_local_cache() {
        let store = store();
        store.remote().save_configs(&[Config::new("a", "", Vec::new())]).await.unwrap();

        let loaded = store.load_configs().await.unwrap();
        assert_eq!(loaded.source, DataSource::Remote);
        assert_eq!(store.local().load_configs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local() {
        let store = store();
        store.save_configs(&[Config::new("a", "", Vec::new())]).await.unwrap();
        store.remote().set_offline(true);

        let loaded = store.load_configs().await.unwrap();
        assert_eq!(loaded.source, DataSource::Local);
        assert_eq!(loaded.value[0].name, "a");
    }

    #[tokio::test]
    async fn failed_remote_write_is_kept_locally() {
        let store = store();
        store.remote().set_offline(true);

        let outcome = store.save_pinned(&["x".to_string()]).await.unwrap();
        assert_matches!(outcome, SaveOutcome::LocalFallback { .. });
        assert_eq!(store.local().load_pinned().await.unwrap(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn both_sides_down_is_an_error() {
        let store = store();
        store.remote().set_offline(true);
        store.local().set_offline(true);
        assert_matches!(store.load_configs().await, Err(CoreError::Persistence(_)));
        assert_matches!(store.save_configs(&[]).await, Err(CoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn repository_load_prunes_stale_pins() {
        let store = store();
        let config = Config::new("a", "", Vec::new());
        let id = config.id.clone();
        store.remote().save_configs(&[config]).await.unwrap();
        store.remote().save_pinned(&[id.clone(), "gone".to_string()]).await.unwrap();

        let loaded = store.load_repository().await.unwrap();
        assert_eq!(loaded.source, DataSource::Remote);
        assert_eq!(loaded.value.pinned().ids(), &[id]);
    }

    #[tokio::test]
    async fn catalog_snapshot_prefers_remote_then_local() {
        let store = store();
        let catalog = FeatureCatalog::builtin();
        store.local().save_catalog_snapshot(&catalog).await.unwrap();

        let loaded = store.load_catalog_snapshot().await.unwrap();
        assert_eq!(loaded.source, DataSource::Local);
        assert_eq!(loaded.value, Some(catalog.clone()));

        assert!(store.save_catalog_snapshot(&catalog).await.unwrap().is_remote());
        assert_eq!(store.load_catalog_snapshot().await.unwrap().source, DataSource::Remote);
    }

    #[tokio::test]
    async fn batch_reports_success_and_failure() {
        let store = store();
        let form = DeploymentForm {
            ftp_path: "/x".into(),
            ..Default::default()
        };
        let names = vec!["ces.txt".to_string(), "ces.txt".to_string()];
        let files = generate_files(&form, None, &names).unwrap();

        let report = store.save_generated_files(&files).await.unwrap();
        assert_eq!(report.status, BatchStatus::Success);
        assert_eq!(report.results[1].final_name.as_deref(), Some("ces(1).txt"));
        assert!(report.results[1].renamed);

        store.remote().set_offline(true);
        let report = store.save_generated_files(&files).await.unwrap();
        assert_eq!(report.status, BatchStatus::Failure);
        assert!(report.results.iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let store = store();
        assert_matches!(store.save_generated_files(&[]).await, Err(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn malformed_remote_catalog_falls_back_to_local() {
        let store = store();
        let builtin = FeatureCatalog::builtin();
        store.local().save_catalog_snapshot(&builtin).await.unwrap();

        let clash = |group: &str| {
            FeatureGroup::new(group, group).with_feature(
                FeatureNode::new("dup", "dup").with_test(CI_NIGHT, TestLevelEntry::new(1, "d")),
            )
        };
        let malformed = FeatureCatalog {
            feature_groups: vec![clash("a"), clash("b")],
            ..Default::default()
        };
        assert!(malformed.validate().is_err());
        store.remote().save_catalog_snapshot(&malformed).await.unwrap();

        let loaded = store.load_catalog_snapshot().await.unwrap();
        assert_eq!(loaded.source, DataSource::Local);
        assert_eq!(loaded.value, Some(builtin));
    }

    #[test]
    fn batch_status_partial() {
        let ok = FileSaveResult {
            requested_name: "a".into(),
            final_name: Some("a".into()),
            renamed: false,
            size: Some(1),
            location: None,
            error: None,
        };
        let failed = FileSaveResult {
            error: Some("boom".into()),
            final_name: None,
            ..ok.clone()
        };
        assert_eq!(BatchSaveReport::from_results(vec![ok, failed]).status, BatchStatus::Partial);
    }
}
