//! Free-text search over a catalog.
//!
//! Filtering always builds a fresh view from the unfiltered catalog, so
//! clearing or changing the query never depends on a previous result.

use crate::catalog::{FeatureCatalog, FeatureGroup, FeatureNode};

/// Trim and lowercase a raw query. Blank queries yield `None`.
pub fn normalize_query(raw: &str) -> Option<String> {
    let query = raw.trim().to_lowercase();
    (!query.is_empty()).then_some(query)
}

fn contains(field: Option<&str>, query: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase().contains(query))
}

/// Does a feature or sub-feature match on its own fields?
pub fn node_matches(node: &FeatureNode, query: &str) -> bool {
    contains(Some(&node.name), query)
        || contains(node.description.as_deref(), query)
        || contains(node.owner.as_deref(), query)
        || contains(node.suite_name.as_deref(), query)
        || contains(node.remark.as_deref(), query)
        || node
            .tests
            .values()
            .any(|entry| contains(entry.description.as_deref(), query))
}

pub fn group_matches(group: &FeatureGroup, query: &str) -> bool {
    contains(Some(&group.name), query) || contains(group.description.as_deref(), query)
}

/// Build the filtered, highlighted view for `query` (already normalized).
///
/// A group matching on its own fields keeps all its features. A feature
/// matching (itself or via its group) keeps all its sub-features, but only
/// sub-features that match on their own are highlighted.
pub fn filter_catalog(catalog: &FeatureCatalog, query: &str) -> FeatureCatalog {
    let mut groups = Vec::new();

    for group in &catalog.feature_groups {
        let group_match = group_matches(group, query);
        let mut features = Vec::new();

        for feature in &group.features {
            let feature_match = group_match || node_matches(feature, query);

            let mut subs = Vec::new();
            let mut any_sub_match = false;
            for sub in &feature.sub_features {
                let sub_match = node_matches(sub, query);
                any_sub_match |= sub_match;
                if feature_match || sub_match {
                    let mut sub = sub.clone();
                    sub.highlighted = sub_match;
                    subs.push(sub);
                }
            }

            if feature_match || any_sub_match {
                let mut feature = feature.clone();
                feature.sub_features = subs;
                feature.highlighted = true;
                features.push(feature);
            }
        }

        if group_match || !features.is_empty() {
            groups.push(FeatureGroup {
                features,
                highlighted: true,
                ..group.clone()
            });
        }
    }

    FeatureCatalog {
        feature_groups: groups,
        ..catalog.clone()
    }
}

/// Number of retained groups and retained features plus sub-features.
pub fn count_results(view: &FeatureCatalog) -> (usize, usize) {
    let features = view
        .feature_groups
        .iter()
        .map(|g| g.descendants().count())
        .sum();
    (view.feature_groups.len(), features)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_query("  BGP "), Some("bgp".to_string()));
        assert_eq!(normalize_query("   "), None);
    }

    #[test]
    fn sub_feature_match_keeps_parent_and_group() {
        let catalog = FeatureCatalog::builtin();
        let view = filter_catalog(&catalog, "ipv6 unicast");

        assert_eq!(view.feature_groups.len(), 1);
        let group = &view.feature_groups[0];
        assert_eq!(group.id, "router_features");
        assert!(group.highlighted);
        assert_eq!(group.features.len(), 1);

        let bgp = &group.features[0];
        assert_eq!(bgp.id, "bgp_routing");
        assert!(bgp.highlighted);
        assert_eq!(bgp.sub_features.len(), 1);
        assert!(bgp.sub_features[0].highlighted);
    }

    #[test]
    fn feature_match_keeps_all_sub_features() {
        let catalog = FeatureCatalog::builtin();
        let view = filter_catalog(&catalog, "l2 service with basic");
        let l2 = view.find_feature("l2_service").unwrap();
        assert_eq!(l2.sub_features.len(), 2);
        assert!(l2.sub_features.iter().all(|s| !s.highlighted));
    }

    #[test]
    fn group_match_keeps_every_feature() {
        let catalog = FeatureCatalog::builtin();
        let view = filter_catalog(&catalog, "routing protocol");
        assert_eq!(count_results(&view), (1, 4));
    }

    #[test]
    fn matches_owner_and_test_descriptions() {
        let catalog = FeatureCatalog::builtin();
        assert_eq!(count_results(&filter_catalog(&catalog, "wangwei")), (1, 1));
        assert_eq!(count_results(&filter_catalog(&catalog, "vfib regression")), (1, 1));
    }

    #[test]
    fn no_match_yields_empty_view() {
        let catalog = FeatureCatalog::builtin();
        let view = filter_catalog(&catalog, "zzz-not-there");
        assert!(view.feature_groups.is_empty());
        assert_eq!(view.test_levels, catalog.test_levels);
    }

    #[test]
    fn filtering_is_not_destructive() {
        let catalog = FeatureCatalog::builtin();
        let first = filter_catalog(&catalog, "bgp");
        let second = filter_catalog(&catalog, "bgp");
        assert_eq!(first, second);
        assert_eq!(catalog, FeatureCatalog::builtin());
    }
}
