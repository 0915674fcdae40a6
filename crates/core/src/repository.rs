//! Saved configs: named snapshots of a selection.
//!
//! The repository owns the config list and the pinned set. Names are unique
//! at every point in time; a collision never overwrites and instead reports
//! a deterministic alternative via [`CoreError::DuplicateName`].

use std::cmp::Ordering;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config_export::ConfigDocument;
use crate::diff::{detect_detailed_changes, total_time};
use crate::error::CoreError;
use crate::naming::{import_copy_name, suggest_alternate_name};
use crate::selection::{dedupe_by_feature, SelectedTest};
use crate::types::{new_id, ConfigId, Timestamp};

/// Modification history is capped at this many records, newest first.
pub const MAX_HISTORY: usize = 50;

/// Modifier recorded when the caller does not name one.
pub const DEFAULT_MODIFIER: &str = "User";

pub const DEFAULT_PAGE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Config model
// ---------------------------------------------------------------------------

/// A compact description of one test inside a modification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationItem {
    pub test_type: String,
    pub feature_name: String,
    pub time: u32,
}

impl From<&SelectedTest> for ModificationItem {
    fn from(test: &SelectedTest) -> Self {
        Self {
            test_type: test.test_type.clone(),
            feature_name: test.feature_name.clone(),
            time: test.time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationChanges {
    pub added: usize,
    pub removed: usize,
    pub added_items: Vec<ModificationItem>,
    pub removed_items: Vec<ModificationItem>,
}

/// One entry of a config's modification history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationRecord {
    pub id: String,
    pub timestamp: Timestamp,
    pub modifier: String,
    pub reason: String,
    pub changes: ModificationChanges,
    pub before_count: usize,
    pub after_count: usize,
    /// Minutes, signed.
    pub time_diff: i64,
}

impl ModificationRecord {
    pub fn between(before: &[SelectedTest], after: &[SelectedTest], reason: &str, modifier: &str) -> Self {
        let changes = detect_detailed_changes(before, after);
        let modifier = modifier.trim();
        Self {
            id: new_id(),
            timestamp: Utc::now(),
            modifier: if modifier.is_empty() {
                DEFAULT_MODIFIER.to_string()
            } else {
                modifier.to_string()
            },
            reason: reason.trim().to_string(),
            changes: ModificationChanges {
                added: changes.added.len(),
                removed: changes.removed.len(),
                added_items: changes.added.iter().map(ModificationItem::from).collect(),
                removed_items: changes.removed.iter().map(ModificationItem::from).collect(),
            },
            before_count: changes.before_count,
            after_count: changes.after_count,
            time_diff: changes.time_diff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "new_id")]
    pub id: ConfigId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tests: Vec<SelectedTest>,
    #[serde(default = "Utc::now")]
    pub created_at: Timestamp,
    #[serde(default = "Utc::now")]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub modification_history: Vec<ModificationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modification_reason: Option<String>,
}

impl Config {
    pub fn new(name: impl Into<String>, description: impl Into<String>, tests: Vec<SelectedTest>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: description.into(),
            tests,
            created_at: now,
            updated_at: now,
            modification_history: Vec::new(),
            last_modifier: None,
            last_modification_reason: None,
        }
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn total_time(&self) -> i64 {
        total_time(&self.tests)
    }

    fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(query)
            || self.description.to_lowercase().contains(query)
            || self.tests.iter().any(|t| {
                t.feature_name.to_lowercase().contains(query)
                    || t.test_type.to_lowercase().contains(query)
                    || t.group_name.to_lowercase().contains(query)
            })
    }
}

// ---------------------------------------------------------------------------
// Pinned set
// ---------------------------------------------------------------------------

/// Ids of pinned configs, in pin order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinnedSet {
    ids: Vec<ConfigId>,
}

impl PinnedSet {
    pub fn from_ids(ids: impl IntoIterator<Item = ConfigId>) -> Self {
        let mut set = Self::default();
        for id in ids {
            if !set.contains(&id) {
                set.ids.push(id);
            }
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    /// Pin or unpin; returns the new pinned state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.remove(id) {
            false
        } else {
            self.ids.push(id.to_string());
            true
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|p| p != id);
        self.ids.len() != before
    }

    /// Drop ids that no longer exist. Returns how many were dropped.
    pub fn prune(&mut self, exists: impl Fn(&str) -> bool) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| exists(id));
        before - self.ids.len()
    }

    pub fn ids(&self) -> &[ConfigId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Name,
    TestCount,
    TotalTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    /// 1-based; clamped into range.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: None,
            sort: SortKey::default(),
            order: SortOrder::default(),
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPage<'a> {
    pub items: Vec<&'a Config>,
    /// Matches across all pages.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Outcome of a multi-config import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    /// Names skipped because a config with that name already exists.
    pub skipped: Vec<String>,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ConfigRepository {
    configs: Vec<Config>,
    pinned: PinnedSet,
}

impl ConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted state. Pinned ids without a config are dropped.
    pub fn from_parts(configs: Vec<Config>, pinned: impl IntoIterator<Item = ConfigId>) -> Self {
        let mut repo = Self {
            configs,
            pinned: PinnedSet::from_ids(pinned),
        };
        repo.prune_pinned();
        repo
    }

    pub fn configs(&self) -> &[Config] {
        &self.configs
    }

    pub fn pinned(&self) -> &PinnedSet {
        &self.pinned
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Config> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Config> {
        self.configs.iter().find(|c| c.name == name)
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    fn require(&self, id: &str) -> Result<&Config, CoreError> {
        self.get(id).ok_or_else(|| not_found(id))
    }

    fn require_mut(&mut self, id: &str) -> Result<&mut Config, CoreError> {
        self.configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn check_name(&self, name: &str, except_id: Option<&str>) -> Result<String, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("config name must not be empty".to_string()));
        }
        let clash = self
            .configs
            .iter()
            .any(|c| c.name == name && Some(c.id.as_str()) != except_id);
        if clash {
            return Err(CoreError::DuplicateName {
                name: name.to_string(),
                suggested: self.suggest_name(name),
            });
        }
        Ok(name.to_string())
    }

    /// Deterministic alternative for a colliding name.
    pub fn suggest_name(&self, name: &str) -> String {
        suggest_alternate_name(name, |candidate| self.name_taken(candidate))
    }

    /// Save a new config. A taken name fails with the suggested alternative.
    pub fn save(&mut self, name: &str, description: &str, tests: Vec<SelectedTest>) -> Result<&Config, CoreError> {
        let name = self.check_name(name, None)?;
        let config = Config::new(name, description.trim(), dedupe_by_feature(tests));
        tracing::debug!(config_id = %config.id, name = %config.name, "Saved config");
        self.configs.push(config);
        Ok(&self.configs[self.configs.len() - 1])
    }

    /// Replace a config's tests, recording what changed.
    pub fn update(
        &mut self,
        id: &str,
        tests: Vec<SelectedTest>,
        reason: &str,
        modifier: &str,
    ) -> Result<&Config, CoreError> {
        let tests = dedupe_by_feature(tests);
        let config = self.require_mut(id)?;
        let record = ModificationRecord::between(&config.tests, &tests, reason, modifier);

        config.last_modifier = Some(record.modifier.clone());
        config.last_modification_reason = Some(record.reason.clone());
        config.updated_at = record.timestamp;
        config.tests = tests;
        config.modification_history.insert(0, record);
        config.modification_history.truncate(MAX_HISTORY);

        tracing::debug!(config_id = %config.id, history = config.modification_history.len(), "Updated config");
        Ok(&*config)
    }

    /// Remove a config and unpin it.
    pub fn delete(&mut self, id: &str) -> Result<Config, CoreError> {
        let index = self
            .configs
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        let removed = self.configs.remove(index);
        self.pinned.remove(id);
        Ok(removed)
    }

    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<&Config, CoreError> {
        self.require(id)?;
        let name = self.check_name(new_name, Some(id))?;
        let config = self.require_mut(id)?;
        config.name = name;
        config.updated_at = Utc::now();
        Ok(&*config)
    }

    /// Filter, sort (pinned first), and paginate.
    pub fn list(&self, query: &ListQuery) -> ConfigPage<'_> {
        let needle = query
            .filter
            .as_deref()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());

        let mut items: Vec<&Config> = self
            .configs
            .iter()
            .filter(|c| needle.as_deref().is_none_or(|q| c.matches(q)))
            .collect();

        items.sort_by(|a, b| {
            let pinned = self.pinned.contains(&b.id).cmp(&self.pinned.contains(&a.id));
            pinned.then_with(|| {
                let ordering = compare_by(a, b, query.sort);
                match query.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            })
        });

        let per_page = if query.per_page == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.per_page
        };
        let total = items.len();
        let total_pages = total.div_ceil(per_page).max(1);
        let page = query.page.clamp(1, total_pages);

        let items = items
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        ConfigPage {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }

    pub fn toggle_pin(&mut self, id: &str) -> Result<bool, CoreError> {
        self.require(id)?;
        Ok(self.pinned.toggle(id))
    }

    /// Replace the pinned set, dropping ids without a config.
    pub fn set_pinned(&mut self, ids: impl IntoIterator<Item = ConfigId>) -> usize {
        self.pinned = PinnedSet::from_ids(ids);
        self.prune_pinned()
    }

    pub fn prune_pinned(&mut self) -> usize {
        let configs = &self.configs;
        let dropped = self.pinned.prune(|id| configs.iter().any(|c| c.id == id));
        if dropped > 0 {
            tracing::debug!(dropped, "Pruned stale pinned config ids");
        }
        dropped
    }

    // -- export / import ----------------------------------------------------

    pub fn export_one(&self, id: &str, now: Timestamp) -> Result<ConfigDocument, CoreError> {
        Ok(ConfigDocument::single(self.require(id)?.clone(), now))
    }

    pub fn export_all(&self, now: Timestamp) -> Result<ConfigDocument, CoreError> {
        if self.configs.is_empty() {
            return Err(CoreError::Validation("no configs to export".to_string()));
        }
        Ok(ConfigDocument::many(self.configs.clone(), now))
    }

    /// Overwrite `target_id` with the document's config, keeping the
    /// target's id and creation time.
    pub fn import_replace(&mut self, target_id: &str, doc: &ConfigDocument, now: Timestamp) -> Result<&Config, CoreError> {
        let incoming = doc.single_config()?.clone();
        self.require(target_id)?;
        let name = self.check_name(&incoming.name, Some(target_id))?;

        let tests = dedupe_by_feature(incoming.tests.iter().cloned());
        let target = self.require_mut(target_id)?;
        let replaced = Config {
            id: target.id.clone(),
            name,
            tests,
            created_at: target.created_at,
            updated_at: now,
            ..incoming
        };
        *target = replaced;
        Ok(&*target)
    }

    /// Add the document's config under a fresh id, renaming `name (n)` on
    /// collision.
    pub fn import_as_new(&mut self, doc: &ConfigDocument, now: Timestamp) -> Result<&Config, CoreError> {
        let incoming = doc.single_config()?.clone();
        if incoming.name.trim().is_empty() {
            return Err(CoreError::Validation("imported config has no name".to_string()));
        }
        let name = import_copy_name(&incoming.name, |n| self.name_taken(n));
        let tests = dedupe_by_feature(incoming.tests.iter().cloned());
        self.configs.push(Config {
            id: new_id(),
            name,
            tests,
            created_at: now,
            updated_at: now,
            ..incoming
        });
        Ok(&self.configs[self.configs.len() - 1])
    }

    /// Add every config whose name is not taken; the rest are skipped.
    pub fn import_many(&mut self, doc: &ConfigDocument, now: Timestamp) -> Result<ImportReport, CoreError> {
        let mut report = ImportReport::default();
        for incoming in doc.all_configs()? {
            if incoming.name.trim().is_empty() || self.name_taken(&incoming.name) {
                report.skipped.push(incoming.name.clone());
                continue;
            }
            self.configs.push(Config {
                id: new_id(),
                tests: dedupe_by_feature(incoming.tests.iter().cloned()),
                updated_at: now,
                ..incoming.clone()
            });
            report.imported += 1;
        }
        tracing::debug!(imported = report.imported, skipped = report.skipped.len(), "Imported configs");
        Ok(report)
    }

    /// Replace the whole config list (e.g. after a reload). Fails on
    /// duplicate names.
    pub fn replace_configs(&mut self, configs: Vec<Config>) -> Result<(), CoreError> {
        ensure_unique_names(&configs)?;
        self.configs = configs;
        self.prune_pinned();
        Ok(())
    }
}

/// Reject lists where two configs share a name.
pub fn ensure_unique_names(configs: &[Config]) -> Result<(), CoreError> {
    for (i, config) in configs.iter().enumerate() {
        if configs[..i].iter().any(|c| c.name == config.name) {
            return Err(CoreError::Conflict(format!(
                "config name '{}' appears more than once",
                config.name
            )));
        }
    }
    Ok(())
}

fn compare_by(a: &Config, b: &Config, key: SortKey) -> Ordering {
    match key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::TestCount => a.test_count().cmp(&b.test_count()),
        SortKey::TotalTime => a.total_time().cmp(&b.total_time()),
    }
    .then_with(|| a.id.cmp(&b.id))
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Config",
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
