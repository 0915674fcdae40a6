//! Naming rules for saved configs and generated files.
//!
//! Every rule here is deterministic: given the same set of taken names it
//! always proposes the same alternative.

use std::sync::LazyLock;

use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;

static NUMBERED_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-(\d+)$").expect("valid regex"));

/// Max length of the group hint appended to smart config names.
pub const GROUP_HINT_MAX_LEN: usize = 15;

/// Suggest a free name for a colliding config name.
///
/// `nightly` becomes `nightly-1`; a name that already ends in `-n` resumes
/// counting at `n + 1` on its base.
///
/// ```
/// use tagsel_core::naming::suggest_alternate_name;
///
/// let taken = |n: &str| n == "nightly" || n == "nightly-1";
/// assert_eq!(suggest_alternate_name("nightly", taken), "nightly-2");
/// assert_eq!(suggest_alternate_name("nightly-1", taken), "nightly-2");
/// ```
pub fn suggest_alternate_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let (base, start) = match NUMBERED_SUFFIX_RE.captures(name) {
        Some(caps) => {
            let base = caps.get(1).map_or(name, |m| m.as_str());
            let start = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .map_or(1, |n| n.saturating_add(1));
            (base, start)
        }
        None => (name, 1),
    };

    (start..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| format!("{base}-{start}"))
}

/// Name for an imported copy: `name`, else `name (1)`, `name (2)`, ...
pub fn import_copy_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(name) {
        return name.to_string();
    }
    (1u64..)
        .map(|n| format!("{name} ({n})"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| format!("{name} (1)"))
}

/// Lowercase, spaces to `_`, drop anything outside `[a-z0-9_]`, cap length.
pub fn shorten_group_name(group_name: &str) -> String {
    group_name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .take(GROUP_HINT_MAX_LEN)
        .collect()
}

/// Most common shortened group name, ties going to the first seen.
pub fn group_hint<'a>(group_names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for name in group_names {
        *counts.entry(shorten_group_name(name)).or_insert(0) += 1;
    }
    let mut best: Option<(String, usize)> = None;
    for (name, count) in counts {
        if best.as_ref().is_none_or(|(_, c)| count > *c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name)
        .filter(|name| !name.is_empty() && name != "unknown")
}

/// Default name for a new config: `config-YYYY-MM-DD[-hint]`, numbered
/// `-1`, `-2`, ... when any existing name already starts with that prefix.
pub fn smart_config_name(existing: &[&str], today: NaiveDate, hint: Option<&str>) -> String {
    let mut base = format!("config-{}", today.format("%Y-%m-%d"));
    if let Some(hint) = hint.filter(|h| !h.is_empty()) {
        base.push('-');
        base.push_str(hint);
    }

    if !existing.iter().any(|name| name.starts_with(&base)) {
        return base;
    }
    (1u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !existing.iter().any(|name| name == candidate))
        .unwrap_or_else(|| base.clone())
}

/// Resolve a generated file name against names already used in the batch
/// (or on disk): `ces.txt` becomes `ces(1).txt`, `ces(2).txt`, ...
///
/// The counter goes before the last extension.
pub fn resolve_duplicate_file_name(file_name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(file_name) {
        return file_name.to_string();
    }
    let (stem, ext) = match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    };
    (1u64..)
        .map(|n| format!("{stem}({n}){ext}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| file_name.to_string())
}

/// Replace every non-alphanumeric character with `_`.
pub fn sanitize_for_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Lowercase slug: runs of non-alphanumerics collapse to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn taken<'a>(names: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |n| names.iter().any(|t| *t == n)
    }

    #[test]
    fn alternate_name_starts_at_one() {
        assert_eq!(suggest_alternate_name("nightly", taken(&["nightly"])), "nightly-1");
    }

    #[test]
    fn alternate_name_resumes_from_suffix() {
        let names = ["nightly-3", "nightly-4"];
        assert_eq!(suggest_alternate_name("nightly-3", taken(&names)), "nightly-5");
    }

    #[test]
    fn alternate_name_handles_dates() {
        let names = ["config-2024-01-15"];
        assert_eq!(
            suggest_alternate_name("config-2024-01-15", taken(&names)),
            "config-2024-01-16"
        );
    }

    #[test]
    fn import_copy_name_uses_parentheses() {
        assert_eq!(import_copy_name("nightly", taken(&[])), "nightly");
        assert_eq!(
            import_copy_name("nightly", taken(&["nightly", "nightly (1)"])),
            "nightly (2)"
        );
    }

    #[test]
    fn shorten_group_name_rules() {
        assert_eq!(shorten_group_name("MPLS-TP Tunnel and Service"), "mplstp_tunnel_a");
        assert_eq!(shorten_group_name("Router Features"), "router_features");
    }

    #[test]
    fn group_hint_picks_most_common() {
        let hint = group_hint(["Router Features", "Other", "Router Features"]);
        assert_eq!(hint.as_deref(), Some("router_features"));
        assert_eq!(group_hint(["unknown"]), None);
        assert_eq!(group_hint(std::iter::empty()), None);
    }

    #[test]
    fn smart_config_name_numbers_same_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(smart_config_name(&[], day, None), "config-2024-03-09");
        assert_eq!(
            smart_config_name(&["config-2024-03-09"], day, None),
            "config-2024-03-09-1"
        );
        assert_eq!(
            smart_config_name(&["config-2024-03-09", "config-2024-03-09-1"], day, None),
            "config-2024-03-09-2"
        );
        assert_eq!(
            smart_config_name(&["config-2024-03-09"], day, Some("router_features")),
            "config-2024-03-09-router_features"
        );
    }

    #[test]
    fn duplicate_file_names_get_counter_before_extension() {
        assert_eq!(resolve_duplicate_file_name("ces.txt", taken(&[])), "ces.txt");
        assert_eq!(resolve_duplicate_file_name("ces.txt", taken(&["ces.txt"])), "ces(1).txt");
        assert_eq!(
            resolve_duplicate_file_name("ces.txt", taken(&["ces.txt", "ces(1).txt"])),
            "ces(2).txt"
        );
        assert_eq!(resolve_duplicate_file_name("README", taken(&["README"])), "README(1)");
    }

    #[test]
    fn slug_and_sanitize() {
        assert_eq!(slugify("  Nightly Run #2 "), "nightly-run-2");
        assert_eq!(slugify("***"), "");
        assert_eq!(sanitize_for_file_name("my config/v2"), "my_config_v2");
    }
}
