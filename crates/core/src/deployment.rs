//! Deployment descriptor emitter.
//!
//! Produces the line-oriented YAML-like file consumed by the deployment
//! tooling. Field order is fixed: `ftp_path`, `patch_path`, `ftp_ring`,
//! `file_type`, then the `args:` list. Values are written verbatim; only
//! line breaks are refused since they would split a field across lines.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::naming::{resolve_duplicate_file_name, slugify};
use crate::selection::SelectedTest;
use crate::types::Timestamp;

/// Only this ring value is written out.
pub const FTP_RING_ALL: &str = "all";
/// Only this file type is written out.
pub const FILE_TYPE_BIN: &str = "bin";

pub const CUSTOM_FILE_EXTENSION: &str = ".txt";
pub const CUSTOM_FILE_NAME_MAX_LEN: usize = 50;
const FORBIDDEN_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback base for [`smart_file_name`] when no usable config name exists.
pub const DEFAULT_FILE_BASE: &str = "config-deployment";

// ---------------------------------------------------------------------------
// Target environments
// ---------------------------------------------------------------------------

/// A named set of predefined target files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub name: &'static str,
    pub files: &'static [&'static str],
}

pub const ENVIRONMENTS: &[Environment] = &[
    Environment {
        name: "AT",
        files: &["104.txt", "105.txt", "106.txt"],
    },
    Environment {
        name: "Data",
        files: &["2100.txt", "2300.txt", "2400.txt", "2507.txt", "2714.txt"],
    },
    Environment {
        name: "CES|PTP",
        files: &["ces.txt", "ptp.txt", "ces(10).txt", "ptp(10).txt"],
    },
];

pub fn is_predefined_file(file_name: &str) -> bool {
    ENVIRONMENTS
        .iter()
        .any(|env| env.files.iter().any(|f| *f == file_name))
}

/// Append `.txt` unless the name already ends with it (case-insensitive).
pub fn normalize_custom_file_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() || name.to_lowercase().ends_with(CUSTOM_FILE_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{CUSTOM_FILE_EXTENSION}")
    }
}

/// Normalize and validate a user-entered target file name.
///
/// `already_selected` holds the names currently picked for generation.
pub fn validate_custom_file_name(raw: &str, already_selected: &[String]) -> Result<String, CoreError> {
    let name = normalize_custom_file_name(raw);
    let invalid = |reason: &str| Err(CoreError::Validation(format!("invalid file name '{name}': {reason}")));

    if name.is_empty() {
        return Err(CoreError::Validation("file name must not be empty".to_string()));
    }
    if name.chars().count() > CUSTOM_FILE_NAME_MAX_LEN {
        return invalid("longer than 50 characters");
    }
    if name.contains(FORBIDDEN_FILE_NAME_CHARS) {
        return invalid("contains one of <>:\"/\\|?*");
    }
    if is_predefined_file(&name) {
        return invalid("already a predefined target");
    }
    if already_selected.iter().any(|s| *s == name) {
        return invalid("already selected");
    }
    Ok(name)
}

/// Suggested descriptor name: slugified config name plus `-YYYYMMDD-HHMM`.
pub fn smart_file_name(config_name: Option<&str>, now: Timestamp) -> String {
    let base = config_name
        .map(slugify)
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_BASE.to_string());
    format!("{base}-{}", now.format("%Y%m%d-%H%M"))
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// The deployment form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentForm {
    pub ftp_path: String,
    pub patch_path: String,
    pub ftp_ring: String,
    pub file_type: String,
}

impl DeploymentForm {
    fn validate(&self) -> Result<(), CoreError> {
        if self.ftp_path.trim().is_empty() {
            return Err(CoreError::Validation("ftp_path is required".to_string()));
        }
        for (field, value) in [("ftp_path", &self.ftp_path), ("patch_path", &self.patch_path)] {
            if value.contains(['\n', '\r']) {
                return Err(CoreError::Validation(format!("{field} must be a single line")));
            }
        }
        Ok(())
    }
}

/// `--include {testType}AND{featureName}` for each entry, in order.
pub fn include_args(selection: &[SelectedTest]) -> Vec<String> {
    selection.iter().map(SelectedTest::include_arg).collect()
}

/// Render the descriptor. The `args:` block appears only for a non-empty
/// selection.
///
/// ```
/// use tagsel_core::deployment::{emit, DeploymentForm};
///
/// let form = DeploymentForm { ftp_path: "/x/y".into(), ..Default::default() };
/// assert_eq!(emit(&form, None).unwrap(), "ftp_path: /x/y\n");
/// ```
pub fn emit(form: &DeploymentForm, selection: Option<&[SelectedTest]>) -> Result<String, CoreError> {
    form.validate()?;

    let mut out = format!("ftp_path: {}\n", form.ftp_path.trim());

    let patch_path = form.patch_path.trim();
    if !patch_path.is_empty() {
        out.push_str(&format!("patch_path: {patch_path}\n"));
    }
    if form.ftp_ring == FTP_RING_ALL {
        out.push_str("ftp_ring: all\n");
    }
    if form.file_type == FILE_TYPE_BIN {
        out.push_str("file_type: bin\n");
    }

    if let Some(tests) = selection.filter(|t| !t.is_empty()) {
        out.push_str("args:\n");
        for arg in include_args(tests) {
            out.push_str(&format!("- {arg}\n"));
        }
    }
    Ok(out)
}

/// One file of a multi-file generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    pub requested_name: String,
    pub file_name: String,
    pub content: String,
    pub renamed: bool,
}

/// Emit one descriptor per target file name.
///
/// Names repeated within the batch get `(n)` before the extension.
pub fn generate_files(
    form: &DeploymentForm,
    selection: Option<&[SelectedTest]>,
    file_names: &[String],
) -> Result<Vec<GeneratedFile>, CoreError> {
    if file_names.is_empty() {
        return Err(CoreError::Validation("select at least one target file".to_string()));
    }
    let content = emit(form, selection)?;

    let mut used: Vec<String> = Vec::with_capacity(file_names.len());
    let mut files = Vec::with_capacity(file_names.len());
    for requested in file_names {
        let file_name = resolve_duplicate_file_name(requested, |n| used.iter().any(|u| u == n));
        used.push(file_name.clone());
        files.push(GeneratedFile {
            renamed: file_name != *requested,
            requested_name: requested.clone(),
            file_name,
            content: content.clone(),
        });
    }
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn selected(level: &str, feature: &str) -> SelectedTest {
        SelectedTest {
            feature_id: feature.into(),
            feature_name: feature.into(),
            test_type: level.into(),
            time: 10,
            group_name: "G".into(),
        }
    }

    #[test]
    fn minimal_descriptor_with_args() {
        let form = DeploymentForm {
            ftp_path: "/x/y".into(),
            patch_path: String::new(),
            ftp_ring: "single".into(),
            file_type: "txt".into(),
        };
        let tests = [selected("ci_night", "tp_tunnels")];
        assert_eq!(
            emit(&form, Some(&tests[..])).unwrap(),
            "ftp_path: /x/y\nargs:\n- --include ci_nightANDtp_tunnels\n"
        );
    }

    #[test]
    fn all_optional_fields_in_order() {
        let form = DeploymentForm {
            ftp_path: " /ftp ".into(),
            patch_path: "/patch".into(),
            ftp_ring: FTP_RING_ALL.into(),
            file_type: FILE_TYPE_BIN.into(),
        };
        assert_eq!(
            emit(&form, Some(&[] as &[SelectedTest])).unwrap(),
            "ftp_path: /ftp\npatch_path: /patch\nftp_ring: all\nfile_type: bin\n"
        );
    }

    #[test]
    fn ftp_path_is_required() {
        let form = DeploymentForm {
            ftp_path: "   ".into(),
            ..Default::default()
        };
        assert_matches!(emit(&form, None), Err(CoreError::Validation(_)));
    }

    #[test]
    fn line_breaks_in_paths_are_rejected() {
        let form = DeploymentForm {
            ftp_path: "/x\nargs:".into(),
            ..Default::default()
        };
        assert_matches!(emit(&form, None), Err(CoreError::Validation(_)));
    }

    #[test]
    fn batch_renames_repeated_names() {
        let form = DeploymentForm {
            ftp_path: "/x".into(),
            ..Default::default()
        };
        let names = vec!["ces.txt".to_string(), "ces.txt".to_string(), "104.txt".to_string()];
        let files = generate_files(&form, None, &names).unwrap();
        let final_names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(final_names, vec!["ces.txt", "ces(1).txt", "104.txt"]);
        assert!(files[1].renamed);
        assert!(!files[0].renamed);
        assert!(files.iter().all(|f| f.content == "ftp_path: /x\n"));
    }

    #[test]
    fn batch_requires_files() {
        let form = DeploymentForm {
            ftp_path: "/x".into(),
            ..Default::default()
        };
        assert_matches!(generate_files(&form, None, &[]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn custom_file_names() {
        assert_eq!(validate_custom_file_name("lab7", &[]).unwrap(), "lab7.txt");
        assert_eq!(validate_custom_file_name("LAB.TXT", &[]).unwrap(), "LAB.TXT");
        assert_matches!(validate_custom_file_name("104", &[]), Err(CoreError::Validation(_)));
        assert_matches!(validate_custom_file_name("a/b", &[]), Err(CoreError::Validation(_)));
        assert_matches!(validate_custom_file_name("", &[]), Err(CoreError::Validation(_)));
        assert_matches!(
            validate_custom_file_name(&"x".repeat(47), &[]),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_custom_file_name("mine", &["mine.txt".to_string()]),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn smart_file_names() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(smart_file_name(Some("Nightly Run"), now), "nightly-run-20240309-1405");
        assert_eq!(smart_file_name(None, now), "config-deployment-20240309-1405");
        assert_eq!(smart_file_name(Some("!!!"), now), "config-deployment-20240309-1405");
    }

    #[test]
    fn predefined_files() {
        assert!(is_predefined_file("ptp(10).txt"));
        assert!(!is_predefined_file("107.txt"));
        assert_eq!(ENVIRONMENTS.iter().map(|e| e.files.len()).sum::<usize>(), 12);
    }
}
