//! Feature catalog model.
//!
//! A catalog is a read-only tree of feature groups, features and (one level
//! of) sub-features. Each node carries a map of test-level entries with a
//! time estimate. Catalogs are replaced wholesale on reload and validated on
//! receipt; nothing in this crate mutates a loaded catalog in place.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Test levels
// ---------------------------------------------------------------------------

pub const CI_NIGHT: &str = "ci_night";
pub const REGRESSION: &str = "regression";
pub const WEEKLY_REGRESSION: &str = "weekly_regression";
pub const FULL_REGRESSION: &str = "full_regression";

/// Levels assumed when a catalog does not declare its own `testLevels`.
pub const DEFAULT_TEST_LEVELS: &[&str] = &[CI_NIGHT, REGRESSION];

/// Human-readable label for a test level. Unknown levels are shown verbatim.
pub fn test_level_display_name(level: &str) -> &str {
    match level {
        CI_NIGHT => "CI Night",
        REGRESSION => "Regression",
        WEEKLY_REGRESSION => "Weekly Regression",
        FULL_REGRESSION => "Full Regression",
        other => other,
    }
}

const BUILTIN_CATALOG_JSON: &str = include_str!("../data/builtin_catalog.json");

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// One test-level entry of a feature (e.g. its `ci_night` run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestLevelEntry {
    /// Estimated run time in minutes.
    #[serde(default)]
    pub time: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    /// Explicit emptiness flag from the loader. Derived when absent.
    #[serde(rename = "isEmpty", default, skip_serializing_if = "Option::is_none")]
    pub empty: Option<bool>,
}

impl TestLevelEntry {
    /// Build an entry, deriving the emptiness flag the same way the loaders do.
    pub fn new(time: u32, description: impl Into<String>) -> Self {
        let description = description.into();
        let empty = description.trim().is_empty() || time == 0;
        Self {
            time,
            description: Some(description),
            confidence: None,
            qty: None,
            empty: Some(empty),
        }
    }

    /// An entry is empty when it has no description or zero time.
    pub fn is_empty(&self) -> bool {
        self.empty.unwrap_or_else(|| {
            self.time == 0
                || self
                    .description
                    .as_deref()
                    .is_none_or(|d| d.trim().is_empty())
        })
    }

    /// Empty entries are displayed but can never be selected.
    pub fn is_selectable(&self) -> bool {
        !self.is_empty()
    }
}

/// A feature or sub-feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureNode {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_qty: Option<u32>,
    /// Test-level entries keyed by level name, in loader order. Required.
    pub tests: IndexMap<String, TestLevelEntry>,
    #[serde(default)]
    pub sub_features: Vec<FeatureNode>,
    /// Set on nodes of a filtered view that matched the search query.
    #[serde(rename = "_highlighted", default, skip_serializing_if = "is_false")]
    pub highlighted: bool,
}

impl FeatureNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            owner: None,
            suite_directory: None,
            suite_name: None,
            remark: None,
            case_qty: None,
            tests: IndexMap::new(),
            sub_features: Vec::new(),
            highlighted: false,
        }
    }

    /// Builder-style helper to attach a test-level entry.
    pub fn with_test(mut self, level: impl Into<String>, entry: TestLevelEntry) -> Self {
        self.tests.insert(level.into(), entry);
        self
    }

    /// Builder-style helper to attach a sub-feature.
    pub fn with_sub_feature(mut self, sub: FeatureNode) -> Self {
        self.sub_features.push(sub);
        self
    }

    /// A node with sub-features is a parent feature.
    pub fn is_parent(&self) -> bool {
        !self.sub_features.is_empty()
    }

    /// The entry for `level`, only if it can be selected.
    pub fn selectable_entry(&self, level: &str) -> Option<&TestLevelEntry> {
        self.tests.get(level).filter(|e| e.is_selectable())
    }

    /// Selectable levels of this node, in its own map order.
    pub fn available_levels(&self) -> impl Iterator<Item = &str> {
        self.tests
            .iter()
            .filter(|(_, e)| e.is_selectable())
            .map(|(level, _)| level.as_str())
    }

    /// First selectable level following `order`, then any remaining
    /// selectable level in map order.
    pub fn first_available_level(&self, order: &[&str]) -> Option<&str> {
        order
            .iter()
            .find_map(|level| self.selectable_entry(level).map(|_| *level))
            .and_then(|level| self.tests.get_key_value(level).map(|(k, _)| k.as_str()))
            .or_else(|| self.available_levels().next())
    }

    /// This node followed by its sub-features.
    pub fn self_and_descendants(&self) -> impl Iterator<Item = &FeatureNode> {
        std::iter::once(self).chain(self.sub_features.iter())
    }
}

/// A named group of top-level features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGroup {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub features: Vec<FeatureNode>,
    #[serde(rename = "_highlighted", default, skip_serializing_if = "is_false")]
    pub highlighted: bool,
}

impl FeatureGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            features: Vec::new(),
            highlighted: false,
        }
    }

    pub fn with_feature(mut self, feature: FeatureNode) -> Self {
        self.features.push(feature);
        self
    }

    /// Every feature of the group, each followed by its sub-features.
    pub fn descendants(&self) -> impl Iterator<Item = &FeatureNode> {
        self.features.iter().flat_map(FeatureNode::self_and_descendants)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The whole loaded data set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCatalog {
    pub feature_groups: Vec<FeatureGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_levels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// A feature together with the group (and parent feature) it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct FlatFeature<'a> {
    pub node: &'a FeatureNode,
    pub group: &'a FeatureGroup,
    pub parent: Option<&'a FeatureNode>,
}

impl FlatFeature<'_> {
    pub fn is_sub_feature(&self) -> bool {
        self.parent.is_some()
    }
}

/// Summary numbers for a catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub group_count: usize,
    pub feature_count: usize,
    pub sub_feature_count: usize,
    pub has_multi_level: bool,
    pub test_levels: Vec<String>,
    /// Sum of selectable entry times per level, across features and sub-features.
    pub time_by_level: IndexMap<String, u64>,
}

impl FeatureCatalog {
    /// Parse and validate a catalog from JSON.
    ///
    /// Structural problems (missing `tests` map, duplicate ids, ...) are
    /// reported as [`CoreError::MalformedCatalog`].
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::MalformedCatalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Same as [`FeatureCatalog::from_json`] for an already-parsed value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        let catalog: Self = serde_json::from_value(value)
            .map_err(|e| CoreError::MalformedCatalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The bundled sample catalog used when nothing else can be loaded.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_CATALOG_JSON).unwrap_or_default()
    }

    /// Declared test levels, or [`DEFAULT_TEST_LEVELS`] when none are declared.
    pub fn effective_test_levels(&self) -> Vec<&str> {
        match &self.test_levels {
            Some(levels) if !levels.is_empty() => levels.iter().map(String::as_str).collect(),
            _ => DEFAULT_TEST_LEVELS.to_vec(),
        }
    }

    /// Check the structural invariants every consumer relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        let malformed = |msg: String| Err(CoreError::MalformedCatalog(msg));

        let declared: Option<HashSet<&str>> = match &self.test_levels {
            Some(levels) if !levels.is_empty() => {
                let mut seen = HashSet::new();
                for level in levels {
                    if level.trim().is_empty() {
                        return malformed("testLevels contains an empty name".to_string());
                    }
                    if !seen.insert(level.as_str()) {
                        return malformed(format!("testLevels declares '{level}' twice"));
                    }
                }
                Some(seen)
            }
            _ => None,
        };

        let mut group_ids = HashSet::new();
        let mut feature_ids = HashSet::new();

        for group in &self.feature_groups {
            if group.id.trim().is_empty() || group.name.trim().is_empty() {
                return malformed(format!(
                    "feature group '{}' is missing an id or name",
                    group.name
                ));
            }
            if !group_ids.insert(group.id.as_str()) {
                return malformed(format!("duplicate group id '{}'", group.id));
            }

            for feature in &group.features {
                check_node(feature, declared.as_ref(), &mut feature_ids)?;
                for sub in &feature.sub_features {
                    if sub.is_parent() {
                        return malformed(format!(
                            "sub-feature '{}' of '{}' cannot have its own sub-features",
                            sub.id, feature.id
                        ));
                    }
                    check_node(sub, declared.as_ref(), &mut feature_ids)?;
                }
            }
        }

        Ok(())
    }

    /// All features and sub-features in display order.
    pub fn flatten(&self) -> Vec<FlatFeature<'_>> {
        let mut flat = Vec::new();
        for group in &self.feature_groups {
            for feature in &group.features {
                flat.push(FlatFeature {
                    node: feature,
                    group,
                    parent: None,
                });
                for sub in &feature.sub_features {
                    flat.push(FlatFeature {
                        node: sub,
                        group,
                        parent: Some(feature),
                    });
                }
            }
        }
        flat
    }

    /// Locate a feature or sub-feature by id, with its group context.
    pub fn locate(&self, feature_id: &str) -> Option<FlatFeature<'_>> {
        for group in &self.feature_groups {
            for feature in &group.features {
                if feature.id == feature_id {
                    return Some(FlatFeature {
                        node: feature,
                        group,
                        parent: None,
                    });
                }
                if let Some(sub) = feature.sub_features.iter().find(|s| s.id == feature_id) {
                    return Some(FlatFeature {
                        node: sub,
                        group,
                        parent: Some(feature),
                    });
                }
            }
        }
        None
    }

    pub fn find_feature(&self, feature_id: &str) -> Option<&FeatureNode> {
        self.locate(feature_id).map(|f| f.node)
    }

    pub fn find_group(&self, group_id: &str) -> Option<&FeatureGroup> {
        self.feature_groups.iter().find(|g| g.id == group_id)
    }

    pub fn group_of_feature(&self, feature_id: &str) -> Option<&FeatureGroup> {
        self.locate(feature_id).map(|f| f.group)
    }

    pub fn has_multi_level_structure(&self) -> bool {
        self.feature_groups
            .iter()
            .any(|g| g.features.iter().any(FeatureNode::is_parent))
    }

    pub fn statistics(&self) -> CatalogStats {
        let levels = self.effective_test_levels();
        let mut time_by_level: IndexMap<String, u64> =
            levels.iter().map(|l| (l.to_string(), 0)).collect();
        let mut feature_count = 0;
        let mut sub_feature_count = 0;

        for flat in self.flatten() {
            if flat.is_sub_feature() {
                sub_feature_count += 1;
            } else {
                feature_count += 1;
            }
            for (level, entry) in &flat.node.tests {
                if entry.is_selectable() {
                    *time_by_level.entry(level.clone()).or_insert(0) += u64::from(entry.time);
                }
            }
        }

        CatalogStats {
            group_count: self.feature_groups.len(),
            feature_count,
            sub_feature_count,
            has_multi_level: sub_feature_count > 0,
            test_levels: levels.iter().map(|l| l.to_string()).collect(),
            time_by_level,
        }
    }
}

fn check_node<'a>(
    node: &'a FeatureNode,
    declared: Option<&HashSet<&str>>,
    seen_ids: &mut HashSet<&'a str>,
) -> Result<(), CoreError> {
    if node.id.trim().is_empty() || node.name.trim().is_empty() {
        return Err(CoreError::MalformedCatalog(format!(
            "feature '{}' is missing an id or name",
            node.name
        )));
    }
    if !seen_ids.insert(node.id.as_str()) {
        return Err(CoreError::MalformedCatalog(format!(
            "duplicate feature id '{}'",
            node.id
        )));
    }
    for level in node.tests.keys() {
        if level.trim().is_empty() {
            return Err(CoreError::MalformedCatalog(format!(
                "feature '{}' has a test entry without a level name",
                node.id
            )));
        }
        if let Some(declared) = declared {
            if !declared.contains(level.as_str()) {
                return Err(CoreError::MalformedCatalog(format!(
                    "feature '{}' uses undeclared test level '{level}'",
                    node.id
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn builtin_catalog_loads_and_validates() {
        let catalog = FeatureCatalog::builtin();
        assert_eq!(catalog.feature_groups.len(), 2);
        assert!(catalog.validate().is_ok());
        assert!(catalog.has_multi_level_structure());
    }

    #[test]
    fn entry_emptiness_is_derived_when_flag_missing() {
        let entry: TestLevelEntry =
            serde_json::from_str(r#"{ "time": 10, "description": "run" }"#).unwrap();
        assert!(entry.is_selectable());

        let zero_time: TestLevelEntry =
            serde_json::from_str(r#"{ "time": 0, "description": "run" }"#).unwrap();
        assert!(zero_time.is_empty());

        let no_desc: TestLevelEntry = serde_json::from_str(r#"{ "time": 5 }"#).unwrap();
        assert!(no_desc.is_empty());
    }

    #[test]
    fn explicit_empty_flag_wins() {
        let entry: TestLevelEntry =
            serde_json::from_str(r#"{ "time": 10, "description": "run", "isEmpty": true }"#)
                .unwrap();
        assert!(entry.is_empty());
    }

    #[test]
    fn missing_tests_map_is_malformed() {
        let json = r#"{
            "featureGroups": [{
                "id": "g", "name": "G",
                "features": [{ "id": "f", "name": "f" }]
            }]
        }"#;
        assert_matches!(
            FeatureCatalog::from_json(json),
            Err(CoreError::MalformedCatalog(_))
        );
    }

    #[test]
    fn duplicate_feature_ids_are_rejected() {
        let catalog = FeatureCatalog {
            feature_groups: vec![
                FeatureGroup::new("g1", "G1")
                    .with_feature(FeatureNode::new("dup", "a").with_test(CI_NIGHT, TestLevelEntry::new(1, "x"))),
                FeatureGroup::new("g2", "G2")
                    .with_feature(FeatureNode::new("dup", "b").with_test(CI_NIGHT, TestLevelEntry::new(1, "x"))),
            ],
            ..Default::default()
        };
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("dup"));
    }

    #[test]
    fn nested_sub_features_are_rejected() {
        let deep = FeatureNode::new("parent", "parent").with_sub_feature(
            FeatureNode::new("child", "child").with_sub_feature(FeatureNode::new("grandchild", "gc")),
        );
        let catalog = FeatureCatalog {
            feature_groups: vec![FeatureGroup::new("g", "G").with_feature(deep)],
            ..Default::default()
        };
        assert_matches!(catalog.validate(), Err(CoreError::MalformedCatalog(_)));
    }

    #[test]
    fn undeclared_level_is_rejected_when_levels_declared() {
        let catalog = FeatureCatalog {
            feature_groups: vec![FeatureGroup::new("g", "G").with_feature(
                FeatureNode::new("f", "f").with_test(WEEKLY_REGRESSION, TestLevelEntry::new(5, "w")),
            )],
            test_levels: Some(vec![CI_NIGHT.to_string()]),
            ..Default::default()
        };
        assert_matches!(catalog.validate(), Err(CoreError::MalformedCatalog(_)));
    }

    #[test]
    fn effective_levels_fall_back_to_defaults() {
        let catalog = FeatureCatalog::default();
        assert_eq!(catalog.effective_test_levels(), vec![CI_NIGHT, REGRESSION]);

        let declared = FeatureCatalog {
            test_levels: Some(vec![REGRESSION.into(), WEEKLY_REGRESSION.into()]),
            ..Default::default()
        };
        assert_eq!(declared.effective_test_levels(), vec![REGRESSION, WEEKLY_REGRESSION]);
    }

    #[test]
    fn locate_finds_sub_feature_with_parent() {
        let catalog = FeatureCatalog::builtin();
        let found = catalog.locate("bgp_ipv6").unwrap();
        assert_eq!(found.group.id, "router_features");
        assert_eq!(found.parent.map(|p| p.id.as_str()), Some("bgp_routing"));
        assert!(catalog.locate("nope").is_none());
    }

    #[test]
    fn first_available_level_follows_catalog_order() {
        let node = FeatureNode::new("f", "f")
            .with_test(REGRESSION, TestLevelEntry::new(20, "r"))
            .with_test(CI_NIGHT, TestLevelEntry::new(0, ""));
        assert_eq!(node.first_available_level(&[CI_NIGHT, REGRESSION]), Some(REGRESSION));

        let both = FeatureNode::new("g", "g")
            .with_test(REGRESSION, TestLevelEntry::new(20, "r"))
            .with_test(CI_NIGHT, TestLevelEntry::new(10, "c"));
        assert_eq!(both.first_available_level(&[CI_NIGHT, REGRESSION]), Some(CI_NIGHT));
    }

    #[test]
    fn statistics_count_features_and_time() {
        let stats = FeatureCatalog::builtin().statistics();
        assert_eq!(stats.group_count, 2);
        assert_eq!(stats.feature_count, 5);
        assert_eq!(stats.sub_feature_count, 4);
        assert!(stats.has_multi_level);
        // 10 + 5 + 8 + 15 + 5 + 20 + 12 + 15 + 18
        assert_eq!(stats.time_by_level[CI_NIGHT], 108);
    }

    #[test]
    fn display_names() {
        assert_eq!(test_level_display_name(CI_NIGHT), "CI Night");
        assert_eq!(test_level_display_name("smoke"), "smoke");
    }
}
