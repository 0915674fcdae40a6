//! The live set of chosen (feature, test level) pairs.
//!
//! At most one entry exists per feature id. Selecting another level for a
//! feature replaces its entry; selecting the same level again removes it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::FeatureCatalog;
use crate::error::CoreError;

/// One selected (feature, test level) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTest {
    pub feature_id: String,
    pub feature_name: String,
    pub test_type: String,
    /// Minutes, copied from the catalog entry at selection time.
    pub time: u32,
    #[serde(default)]
    pub group_name: String,
}

impl SelectedTest {
    /// Identity used by set comparisons: `featureId-testType`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.feature_id, self.test_type)
    }

    /// The CLI argument for this entry, e.g. `--include ci_nightANDtp_tunnels`.
    pub fn include_arg(&self) -> String {
        format!("--include {}AND{}", self.test_type, self.feature_name)
    }
}

/// What a call to [`SelectionStore::select`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected,
    /// Another level of the same feature was replaced.
    Replaced { previous: String },
    /// The same pair was selected twice and is now off.
    Deselected,
    /// Unknown feature or non-selectable level; nothing changed.
    Ignored,
}

/// Per-level breakdown of a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub count: usize,
    pub time: u64,
}

/// Summary of a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStats {
    pub count: usize,
    pub total_time: u64,
    pub by_level: IndexMap<String, LevelStats>,
}

/// How many of a group's features (sub-features included) are selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub group_id: String,
    pub group_name: String,
    pub total: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStore {
    entries: Vec<SelectedTest>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle-select `level` for `feature_id`.
    ///
    /// Invalid input is a no-op reported as [`SelectOutcome::Ignored`].
    pub fn select(&mut self, catalog: &FeatureCatalog, feature_id: &str, level: &str) -> SelectOutcome {
        let Some(test) = resolve(catalog, feature_id, level) else {
            return SelectOutcome::Ignored;
        };

        match self.take(feature_id) {
            Some(previous) if previous.test_type == level => SelectOutcome::Deselected,
            Some(previous) => {
                self.entries.push(test);
                SelectOutcome::Replaced {
                    previous: previous.test_type,
                }
            }
            None => {
                self.entries.push(test);
                SelectOutcome::Selected
            }
        }
    }

    /// Set `level` for `feature_id` without toggling.
    ///
    /// Used by batch actions: a feature already on `level` stays selected.
    /// Returns `true` when the store changed.
    pub fn assign(&mut self, catalog: &FeatureCatalog, feature_id: &str, level: &str) -> bool {
        let Some(test) = resolve(catalog, feature_id, level) else {
            return false;
        };
        if let Some(existing) = self.entries.iter_mut().find(|e| e.feature_id == feature_id) {
            if existing.test_type == level {
                return false;
            }
            *existing = test;
        } else {
            self.entries.push(test);
        }
        true
    }

    /// Remove any entry for `feature_id`. Returns `true` if one existed.
    pub fn deselect(&mut self, feature_id: &str) -> bool {
        self.take(feature_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole selection, keeping the last entry per feature id.
    pub fn replace_all(&mut self, tests: impl IntoIterator<Item = SelectedTest>) {
        self.entries = dedupe_by_feature(tests);
    }

    pub fn get(&self, feature_id: &str) -> Option<&SelectedTest> {
        self.entries.iter().find(|e| e.feature_id == feature_id)
    }

    pub fn is_selected(&self, feature_id: &str, level: &str) -> bool {
        self.get(feature_id).is_some_and(|e| e.test_type == level)
    }

    pub fn entries(&self) -> &[SelectedTest] {
        &self.entries
    }

    pub fn to_vec(&self) -> Vec<SelectedTest> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_time(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.time)).sum()
    }

    /// Entries grouped by group name, groups in order of first appearance.
    pub fn by_group(&self) -> IndexMap<&str, Vec<&SelectedTest>> {
        let mut groups: IndexMap<&str, Vec<&SelectedTest>> = IndexMap::new();
        for entry in &self.entries {
            groups.entry(entry.group_name.as_str()).or_default().push(entry);
        }
        groups
    }

    pub fn stats(&self) -> SelectionStats {
        let mut by_level: IndexMap<String, LevelStats> = IndexMap::new();
        for entry in &self.entries {
            let level = by_level.entry(entry.test_type.clone()).or_default();
            level.count += 1;
            level.time += u64::from(entry.time);
        }
        SelectionStats {
            count: self.entries.len(),
            total_time: self.total_time(),
            by_level,
        }
    }

    /// Per-group counts against `catalog`, in catalog order.
    pub fn group_stats(&self, catalog: &FeatureCatalog) -> Vec<GroupStats> {
        catalog
            .feature_groups
            .iter()
            .map(|group| {
                let mut total = 0;
                let mut selected = 0;
                for feature in group.descendants() {
                    total += 1;
                    if self.get(&feature.id).is_some() {
                        selected += 1;
                    }
                }
                GroupStats {
                    group_id: group.id.clone(),
                    group_name: group.name.clone(),
                    total,
                    selected,
                }
            })
            .collect()
    }

    /// The command text: one `- --include ...` line per entry.
    pub fn command_text(&self) -> Result<String, CoreError> {
        if self.entries.is_empty() {
            return Err(CoreError::Validation(
                "select at least one test before generating a command".to_string(),
            ));
        }
        Ok(self
            .entries
            .iter()
            .map(|e| format!("- {}\n", e.include_arg()))
            .collect())
    }

    fn take(&mut self, feature_id: &str) -> Option<SelectedTest> {
        let index = self.entries.iter().position(|e| e.feature_id == feature_id)?;
        Some(self.entries.remove(index))
    }
}

fn resolve(catalog: &FeatureCatalog, feature_id: &str, level: &str) -> Option<SelectedTest> {
    let found = catalog.locate(feature_id)?;
    let entry = found.node.selectable_entry(level)?;
    Some(SelectedTest {
        feature_id: found.node.id.clone(),
        feature_name: found.node.name.clone(),
        test_type: level.to_string(),
        time: entry.time,
        group_name: found.group.name.clone(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Collapse a test list to one entry per feature id. The last entry for a
/// feature wins and takes that feature's final position.
pub fn dedupe_by_feature(tests: impl IntoIterator<Item = SelectedTest>) -> Vec<SelectedTest> {
    let mut out: Vec<SelectedTest> = Vec::new();
    for test in tests {
        out.retain(|e| e.feature_id != test.feature_id);
        out.push(test);
    }
    out
}
