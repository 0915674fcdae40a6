//! Batch selection over a group or a parent feature.
//!
//! Batch actions are plain data ([`BatchAction`]) consumed by a single
//! reducer, [`apply`]. The target is resolved in whatever catalog view the
//! caller passes in, so a filtered view limits the batch to visible nodes.

use serde::{Deserialize, Serialize};

use crate::catalog::{FeatureCatalog, FeatureNode};
use crate::error::CoreError;
use crate::selection::SelectionStore;

/// The subtree a batch action applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchTarget {
    /// Every feature and sub-feature of a group.
    Group(String),
    /// A feature and its sub-features.
    ParentFeature(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BatchAction {
    #[serde(rename_all = "camelCase")]
    SelectLevel { target: BatchTarget, test_level: String },
    SelectAll { target: BatchTarget },
    DeselectAll { target: BatchTarget },
}

impl BatchAction {
    pub fn target(&self) -> &BatchTarget {
        match self {
            Self::SelectLevel { target, .. } | Self::SelectAll { target } | Self::DeselectAll { target } => target,
        }
    }
}

/// Result of applying a batch action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub target_name: String,
    /// Number of descendants whose selection changed.
    pub affected: usize,
}

/// Resolved batch scope: display name plus descendant nodes.
struct Scope<'a> {
    name: &'a str,
    nodes: Vec<&'a FeatureNode>,
}

fn resolve<'a>(view: &'a FeatureCatalog, target: &BatchTarget) -> Result<Scope<'a>, CoreError> {
    match target {
        BatchTarget::Group(id) => {
            let group = view.find_group(id).ok_or_else(|| CoreError::NotFound {
                entity: "FeatureGroup",
                id: id.clone(),
            })?;
            Ok(Scope {
                name: &group.name,
                nodes: group.descendants().collect(),
            })
        }
        BatchTarget::ParentFeature(id) => {
            let feature = view.find_feature(id).ok_or_else(|| CoreError::NotFound {
                entity: "Feature",
                id: id.clone(),
            })?;
            Ok(Scope {
                name: &feature.name,
                nodes: feature.self_and_descendants().collect(),
            })
        }
    }
}

/// Levels for which at least one descendant has a selectable entry.
///
/// Ordered by the catalog's test levels, with any undeclared levels after.
pub fn available_test_levels(view: &FeatureCatalog, target: &BatchTarget) -> Result<Vec<String>, CoreError> {
    let scope = resolve(view, target)?;
    let mut levels: Vec<String> = view
        .effective_test_levels()
        .into_iter()
        .filter(|level| scope.nodes.iter().any(|n| n.selectable_entry(level).is_some()))
        .map(str::to_string)
        .collect();

    for node in &scope.nodes {
        for level in node.available_levels() {
            if !levels.iter().any(|l| l == level) {
                levels.push(level.to_string());
            }
        }
    }
    Ok(levels)
}

/// Apply a batch action.
///
/// `view` is used to find the descendants; `catalog` (the unfiltered data)
/// is used to resolve each selection.
pub fn apply(
    view: &FeatureCatalog,
    catalog: &FeatureCatalog,
    store: &mut SelectionStore,
    action: &BatchAction,
) -> Result<BatchOutcome, CoreError> {
    let scope = resolve(view, action.target())?;
    let order = catalog.effective_test_levels();

    let affected = match action {
        BatchAction::SelectLevel { test_level, .. } => scope
            .nodes
            .iter()
            .filter(|n| n.selectable_entry(test_level).is_some())
            .filter(|n| store.assign(catalog, &n.id, test_level))
            .count(),
        BatchAction::SelectAll { .. } => scope
            .nodes
            .iter()
            .filter_map(|n| n.first_available_level(&order).map(|level| (n, level)))
            .filter(|(n, level)| store.assign(catalog, &n.id, level))
            .count(),
        BatchAction::DeselectAll { .. } => scope.nodes.iter().filter(|n| store.deselect(&n.id)).count(),
    };

    tracing::debug!(target_name = scope.name, affected, "Applied batch action");

    Ok(BatchOutcome {
        target_name: scope.name.to_string(),
        affected,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::catalog::{FeatureGroup, TestLevelEntry, CI_NIGHT, REGRESSION};

    fn catalog() -> FeatureCatalog {
        let parent = FeatureNode::new("p", "parent")
            .with_sub_feature(FeatureNode::new("s1", "S1").with_test(CI_NIGHT, TestLevelEntry::new(5, "ci")))
            .with_sub_feature(FeatureNode::new("s2", "S2").with_test(REGRESSION, TestLevelEntry::new(9, "reg")));
        let plain = FeatureNode::new("f", "F")
            .with_test(CI_NIGHT, TestLevelEntry::new(10, "ci"))
            .with_test(REGRESSION, TestLevelEntry::new(20, "reg"));
        FeatureCatalog {
            feature_groups: vec![FeatureGroup::new("g", "Group").with_feature(parent).with_feature(plain)],
            test_levels: Some(vec![CI_NIGHT.into(), REGRESSION.into()]),
            ..Default::default()
        }
    }

    #[test]
    fn available_levels_are_a_union() {
        let catalog = catalog();
        let levels = available_test_levels(&catalog, &BatchTarget::ParentFeature("p".into())).unwrap();
        assert_eq!(levels, vec![CI_NIGHT, REGRESSION]);
    }

    #[test]
    fn select_all_picks_first_level_per_descendant() {
        let catalog = catalog();
        let mut store = SelectionStore::new();
        let outcome = apply(
            &catalog,
            &catalog,
            &mut store,
            &BatchAction::SelectAll {
                target: BatchTarget::ParentFeature("p".into()),
            },
        )
        .unwrap();

        assert_eq!(outcome.affected, 2);
        assert!(store.is_selected("s1", CI_NIGHT));
        assert!(store.is_selected("s2", REGRESSION));
    }

    #[test]
    fn select_level_leaves_other_descendants_alone() {
        let catalog = catalog();
        let mut store = SelectionStore::new();
        store.select(&catalog, "s2", REGRESSION);

        let outcome = apply(
            &catalog,
            &catalog,
            &mut store,
            &BatchAction::SelectLevel {
                target: BatchTarget::Group("g".into()),
                test_level: CI_NIGHT.into(),
            },
        )
        .unwrap();

        assert_eq!(outcome.affected, 2);
        assert!(store.is_selected("s1", CI_NIGHT));
        assert!(store.is_selected("f", CI_NIGHT));
        assert!(store.is_selected("s2", REGRESSION));
        assert_eq!(store.total_time(), 5 + 10 + 9);
    }

    #[test]
    fn repeated_select_level_keeps_selection() {
        let catalog = catalog();
        let mut store = SelectionStore::new();
        let action = BatchAction::SelectLevel {
            target: BatchTarget::Group("g".into()),
            test_level: REGRESSION.into(),
        };
        apply(&catalog, &catalog, &mut store, &action).unwrap();
        let again = apply(&catalog, &catalog, &mut store, &action).unwrap();
        assert_eq!(again.affected, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn deselect_all_clears_subtree_only() {
        let catalog = catalog();
        let mut store = SelectionStore::new();
        store.select(&catalog, "s1", CI_NIGHT);
        store.select(&catalog, "f", CI_NIGHT);

        let outcome = apply(
            &catalog,
            &catalog,
            &mut store,
            &BatchAction::DeselectAll {
                target: BatchTarget::ParentFeature("p".into()),
            },
        )
        .unwrap();
        assert_eq!(outcome.affected, 1);
        assert_eq!(outcome.target_name, "parent");
        assert!(store.is_selected("f", CI_NIGHT));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let catalog = catalog();
        let mut store = SelectionStore::new();
        let result = apply(
            &catalog,
            &catalog,
            &mut store,
            &BatchAction::SelectAll {
                target: BatchTarget::Group("nope".into()),
            },
        );
        assert_matches!(result, Err(CoreError::NotFound { .. }));
    }

    #[test]
    fn actions_deserialize_from_tagged_json() {
        let action: BatchAction = serde_json::from_str(
            r#"{ "kind": "select-level", "target": { "group": "g" }, "testLevel": "ci_night" }"#,
        )
        .unwrap();
        assert_eq!(
            action,
            BatchAction::SelectLevel {
                target: BatchTarget::Group("g".into()),
                test_level: CI_NIGHT.into(),
            }
        );
    }
}
