//! Application session context.
//!
//! A [`Session`] owns everything a user works with at once: the catalog,
//! the live selection, the saved configs, the active-config tracker and the
//! current search query. Front-ends hold one session and call into it; the
//! coupling rules between the parts live here:
//!
//! - every selection change refreshes the tracker,
//! - [`Session::clear_all`] always ends active-config editing,
//! - deleting (or replacing via import) the active config unbinds it,
//! - a rejected catalog leaves the previous one in place.

use chrono::{NaiveDate, Utc};

use crate::batch::{self, BatchAction, BatchOutcome};
use crate::catalog::FeatureCatalog;
use crate::config_export::ConfigDocument;
use crate::deployment::{self, DeploymentForm, GeneratedFile};
use crate::diff::ChangeSet;
use crate::error::CoreError;
use crate::naming::{group_hint, smart_config_name};
use crate::repository::{Config, ConfigRepository, ImportReport};
use crate::search::{count_results, filter_catalog, normalize_query};
use crate::selection::{GroupStats, SelectOutcome, SelectionStore};
use crate::tracker::{ActiveConfigTracker, TrackerState};

#[derive(Debug, Clone, Default)]
pub struct Session {
    catalog: FeatureCatalog,
    selection: SelectionStore,
    tracker: ActiveConfigTracker,
    repository: ConfigRepository,
    search_query: Option<String>,
}

impl Session {
    pub fn new(catalog: FeatureCatalog, repository: ConfigRepository) -> Self {
        Self {
            catalog,
            repository,
            ..Default::default()
        }
    }

    /// Session over the bundled catalog with no saved configs.
    pub fn with_builtin_catalog() -> Self {
        Self::new(FeatureCatalog::builtin(), ConfigRepository::new())
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn tracker(&self) -> &ActiveConfigTracker {
        &self.tracker
    }

    pub fn repository(&self) -> &ConfigRepository {
        &self.repository
    }

    /// Install a reloaded repository. An active binding is kept; committing
    /// to a config the new repository lacks fails and unbinds.
    pub fn replace_repository(&mut self, repository: ConfigRepository) {
        tracing::debug!(configs = repository.len(), "Repository replaced");
        self.repository = repository;
    }

    // -- catalog ------------------------------------------------------------

    /// Swap in a new catalog wholesale. Current selections are kept.
    pub fn replace_catalog(&mut self, catalog: FeatureCatalog) -> Result<(), CoreError> {
        catalog.validate()?;
        tracing::info!(
            groups = catalog.feature_groups.len(),
            source = catalog.source.as_deref().unwrap_or("unknown"),
            "Catalog replaced"
        );
        self.catalog = catalog;
        Ok(())
    }

    /// Parse and install a catalog. On failure the previous catalog stays.
    pub fn load_catalog_json(&mut self, json: &str) -> Result<(), CoreError> {
        match FeatureCatalog::from_json(json) {
            Ok(catalog) => self.replace_catalog(catalog),
            Err(e) => {
                tracing::warn!(error = %e, "Rejected catalog, keeping the previous one");
                Err(e)
            }
        }
    }

    // -- selection ----------------------------------------------------------

    pub fn select(&mut self, feature_id: &str, level: &str) -> SelectOutcome {
        let outcome = self.selection.select(&self.catalog, feature_id, level);
        self.refresh_tracker();
        outcome
    }

    pub fn deselect(&mut self, feature_id: &str) -> bool {
        let removed = self.selection.deselect(feature_id);
        self.refresh_tracker();
        removed
    }

    /// Empty the selection and leave active-config editing.
    pub fn clear_all(&mut self) {
        self.selection.clear();
        self.tracker.clear();
    }

    /// Run a batch action scoped to the current (possibly filtered) view.
    pub fn apply_batch(&mut self, action: &BatchAction) -> Result<BatchOutcome, CoreError> {
        let outcome = match self.filtered_view() {
            Some(view) => batch::apply(&view, &self.catalog, &mut self.selection, action)?,
            None => {
                let catalog = &self.catalog;
                batch::apply(catalog, catalog, &mut self.selection, action)?
            }
        };
        self.refresh_tracker();
        Ok(outcome)
    }

    fn refresh_tracker(&mut self) -> TrackerState {
        self.tracker.refresh(self.selection.entries())
    }

    // -- search -------------------------------------------------------------

    pub fn set_search(&mut self, raw: &str) {
        self.search_query = normalize_query(raw);
    }

    pub fn clear_search(&mut self) {
        self.search_query = None;
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_query.as_deref()
    }

    fn filtered_view(&self) -> Option<FeatureCatalog> {
        self.search_query
            .as_deref()
            .map(|query| filter_catalog(&self.catalog, query))
    }

    /// The catalog as currently displayed: filtered when a query is set.
    pub fn view(&self) -> FeatureCatalog {
        self.filtered_view().unwrap_or_else(|| self.catalog.clone())
    }

    /// Selected/total counts for every catalog group.
    pub fn group_stats(&self) -> Vec<GroupStats> {
        self.selection.group_stats(&self.catalog)
    }

    /// `(groups, features)` visible in the current view.
    pub fn search_counts(&self) -> (usize, usize) {
        count_results(&self.view())
    }

    // -- active config ------------------------------------------------------

    /// Bind a saved config and copy its tests into the selection.
    pub fn load_config(&mut self, id: &str) -> Result<&Config, CoreError> {
        let config = self.repository.get(id).ok_or_else(|| CoreError::NotFound {
            entity: "Config",
            id: id.to_string(),
        })?;
        self.selection.replace_all(config.tests.iter().cloned());
        self.tracker.bind(&config.id, &config.name, self.selection.entries());
        tracing::debug!(config_id = %config.id, tests = config.tests.len(), "Loaded config");
        Ok(config)
    }

    /// Stop editing the active config. The selection is left as is.
    pub fn clear_active_config(&mut self) {
        self.tracker.clear();
    }

    /// Restore the selection from the active config's snapshot.
    pub fn revert_to_original(&mut self) -> Result<(), CoreError> {
        let binding = self
            .tracker
            .binding()
            .ok_or_else(|| CoreError::Validation("no active config to revert to".to_string()))?;
        self.selection.replace_all(binding.original_tests.iter().cloned());
        self.refresh_tracker();
        Ok(())
    }

    /// Write the live selection back into the active config.
    pub fn commit_update(&mut self, reason: &str, modifier: &str) -> Result<&Config, CoreError> {
        if self.tracker.state() != TrackerState::Modified {
            return Err(CoreError::Validation("active config has no unsaved changes".to_string()));
        }
        let id = self
            .tracker
            .active_id()
            .map(str::to_string)
            .ok_or_else(|| CoreError::Internal("modified tracker without binding".to_string()))?;

        if self.repository.get(&id).is_none() {
            self.tracker.clear();
            return Err(CoreError::NotFound { entity: "Config", id });
        }

        let config = self.repository.update(&id, self.selection.to_vec(), reason, modifier)?;
        self.tracker.mark_synced(&config.tests);
        Ok(config)
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn pending_changes(&self) -> Option<ChangeSet> {
        self.tracker.pending_changes(self.selection.entries())
    }

    // -- configs ------------------------------------------------------------

    /// Default name for saving the current selection.
    pub fn suggested_config_name(&self, today: NaiveDate) -> String {
        let existing: Vec<&str> = self.repository.configs().iter().map(|c| c.name.as_str()).collect();
        let hint = group_hint(self.selection.entries().iter().map(|t| t.group_name.as_str()));
        smart_config_name(&existing, today, hint.as_deref())
    }

    /// Save the current selection as a new config.
    pub fn save_current(&mut self, name: &str, description: &str) -> Result<&Config, CoreError> {
        if self.selection.is_empty() {
            return Err(CoreError::Validation("select at least one test before saving".to_string()));
        }
        let tests = self.selection.to_vec();
        self.repository.save(name, description, tests)
    }

    /// Delete a config; unbinds the tracker if it was the active one.
    pub fn delete_config(&mut self, id: &str) -> Result<Config, CoreError> {
        let removed = self.repository.delete(id)?;
        if self.tracker.is_active(id) {
            self.tracker.clear();
        }
        Ok(removed)
    }

    pub fn toggle_pin(&mut self, id: &str) -> Result<bool, CoreError> {
        self.repository.toggle_pin(id)
    }

    pub fn rename_config(&mut self, id: &str, new_name: &str) -> Result<&Config, CoreError> {
        let config = self.repository.rename(id, new_name)?;
        self.tracker.rename(&config.id, &config.name);
        Ok(config)
    }

    /// Overwrite `target_id` from an imported document.
    ///
    /// If the target is being edited and the import succeeds, editing ends:
    /// its snapshot is stale.
    pub fn import_replace(&mut self, target_id: &str, doc: &ConfigDocument) -> Result<&Config, CoreError> {
        let was_active = self.tracker.is_active(target_id);
        let config = self.repository.import_replace(target_id, doc, Utc::now())?;
        if was_active {
            self.tracker.clear();
        }
        Ok(config)
    }

    pub fn import_as_new(&mut self, doc: &ConfigDocument) -> Result<&Config, CoreError> {
        self.repository.import_as_new(doc, Utc::now())
    }

    pub fn import_many(&mut self, doc: &ConfigDocument) -> Result<ImportReport, CoreError> {
        self.repository.import_many(doc, Utc::now())
    }

    // -- output -------------------------------------------------------------

    pub fn generate_command(&self) -> Result<String, CoreError> {
        self.selection.command_text()
    }

    /// Emit one descriptor per file name; the selection goes into `args:`
    /// when `include_selection` is set.
    pub fn generate_deployment(
        &self,
        form: &DeploymentForm,
        file_names: &[String],
        include_selection: bool,
    ) -> Result<Vec<GeneratedFile>, CoreError> {
        let selection = include_selection.then(|| self.selection.entries());
        deployment::generate_files(form, selection, file_names)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
