//! Active-config tracking.
//!
//! Binds one saved config to the live selection and reports whether the
//! selection has diverged from the config's snapshot.
//!
//! ```text
//!   Idle --bind--> Synced --selection changes set--> Modified
//!    ^               ^  |                              |
//!    |               |  +--------- revert / commit ----+
//!    +---- clear / clear all / delete active config ---+
//! ```

use indexmap::IndexMap;
use serde::Serialize;

use crate::diff::{classify, detect_detailed_changes, same_selection, ChangeSet, DiffStatus};
use crate::selection::SelectedTest;
use crate::types::ConfigId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    /// No config is bound.
    Idle,
    /// Bound, selection matches the snapshot.
    Synced,
    /// Bound, selection differs from the snapshot.
    Modified,
}

/// The config currently being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConfigBinding {
    pub id: ConfigId,
    pub name: String,
    pub original_tests: Vec<SelectedTest>,
    pub has_unsaved_changes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveConfigTracker {
    binding: Option<ActiveConfigBinding>,
}

impl ActiveConfigTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a config; the snapshot becomes the comparison baseline.
    pub fn bind(&mut self, id: impl Into<ConfigId>, name: impl Into<String>, tests: &[SelectedTest]) {
        self.binding = Some(ActiveConfigBinding {
            id: id.into(),
            name: name.into(),
            original_tests: tests.to_vec(),
            has_unsaved_changes: false,
        });
    }

    pub fn clear(&mut self) {
        self.binding = None;
    }

    pub fn binding(&self) -> Option<&ActiveConfigBinding> {
        self.binding.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.id.as_str())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_id() == Some(id)
    }

    pub fn state(&self) -> TrackerState {
        match &self.binding {
            None => TrackerState::Idle,
            Some(b) if b.has_unsaved_changes => TrackerState::Modified,
            Some(_) => TrackerState::Synced,
        }
    }

    /// Recompute the unsaved-changes flag against the live selection.
    pub fn refresh(&mut self, current: &[SelectedTest]) -> TrackerState {
        if let Some(binding) = &mut self.binding {
            binding.has_unsaved_changes = !same_selection(&binding.original_tests, current);
        }
        self.state()
    }

    /// What changed since the snapshot; `None` when idle.
    pub fn pending_changes(&self, current: &[SelectedTest]) -> Option<ChangeSet> {
        self.binding
            .as_ref()
            .map(|b| detect_detailed_changes(&b.original_tests, current))
    }

    /// Per-test status against the snapshot, for display.
    pub fn key_statuses(&self, current: &[SelectedTest]) -> IndexMap<String, DiffStatus> {
        self.binding
            .as_ref()
            .map(|b| classify(&b.original_tests, current))
            .unwrap_or_default()
    }

    /// Adopt `tests` as the new baseline after a successful commit.
    pub fn mark_synced(&mut self, tests: &[SelectedTest]) {
        if let Some(binding) = &mut self.binding {
            binding.original_tests = tests.to_vec();
            binding.has_unsaved_changes = false;
        }
    }

    /// Keep the binding's display name in sync with a rename.
    pub fn rename(&mut self, id: &str, name: &str) {
        if let Some(binding) = self.binding.as_mut().filter(|b| b.id == id) {
            binding.name = name.to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
