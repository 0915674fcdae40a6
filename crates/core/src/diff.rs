//! Set-based change detection between two test selections.
//!
//! Entries are compared by their `featureId-testType` key. Order never
//! matters: reordering the same entries produces an empty change set.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::selection::SelectedTest;

/// The status of one selected test when comparing two selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Unchanged,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Difference between a `before` and an `after` selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Entries of `after` whose key is absent from `before`, in `after` order.
    pub added: Vec<SelectedTest>,
    /// Entries of `before` whose key is absent from `after`, in `before` order.
    pub removed: Vec<SelectedTest>,
    /// `sum(after.time) - sum(before.time)`, in minutes.
    pub time_diff: i64,
    pub before_count: usize,
    pub after_count: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn keyed(tests: &[SelectedTest]) -> IndexMap<String, &SelectedTest> {
    tests.iter().map(|t| (t.key(), t)).collect()
}

pub fn total_time(tests: &[SelectedTest]) -> i64 {
    tests.iter().map(|t| i64::from(t.time)).sum()
}

/// Compute the keyed set difference between two selections.
pub fn detect_detailed_changes(before: &[SelectedTest], after: &[SelectedTest]) -> ChangeSet {
    let before_keys = keyed(before);
    let after_keys = keyed(after);

    let added = after_keys
        .iter()
        .filter(|(key, _)| !before_keys.contains_key(*key))
        .map(|(_, t)| (*t).clone())
        .collect();
    let removed = before_keys
        .iter()
        .filter(|(key, _)| !after_keys.contains_key(*key))
        .map(|(_, t)| (*t).clone())
        .collect();

    ChangeSet {
        added,
        removed,
        time_diff: total_time(after) - total_time(before),
        before_count: before.len(),
        after_count: after.len(),
    }
}

/// Same membership, ignoring order.
pub fn same_selection(a: &[SelectedTest], b: &[SelectedTest]) -> bool {
    let a_keys = keyed(a);
    let b_keys = keyed(b);
    a_keys.len() == b_keys.len() && a_keys.keys().all(|k| b_keys.contains_key(k))
}

/// Status of every key across both selections, `before` keys first.
pub fn classify(before: &[SelectedTest], after: &[SelectedTest]) -> IndexMap<String, DiffStatus> {
    let after_keys = keyed(after);
    let mut statuses: IndexMap<String, DiffStatus> = before
        .iter()
        .map(|t| {
            let status = if after_keys.contains_key(&t.key()) {
                DiffStatus::Unchanged
            } else {
                DiffStatus::Removed
            };
            (t.key(), status)
        })
        .collect();
    for key in after_keys.keys() {
        statuses.entry(key.clone()).or_insert(DiffStatus::Added);
    }
    statuses
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
