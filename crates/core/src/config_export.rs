//! Portable export document for saved configs.
//!
//! Two shapes share one envelope: a multi-config export
//! (`{ version, exportDate, configs }`) and a single-config export
//! (`{ version, exportDate, type: "single_config", config }`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::naming::sanitize_for_file_name;
use crate::repository::Config;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const EXPORT_VERSION: &str = "1.0";
pub const SINGLE_CONFIG_TYPE: &str = "single_config";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<Timestamp>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<Vec<Config>>,
}

fn default_version() -> String {
    EXPORT_VERSION.to_string()
}

impl ConfigDocument {
    pub fn single(config: Config, now: Timestamp) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: Some(now),
            kind: Some(SINGLE_CONFIG_TYPE.to_string()),
            config: Some(config),
            configs: None,
        }
    }

    pub fn many(configs: Vec<Config>, now: Timestamp) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_date: Some(now),
            kind: None,
            config: None,
            configs: Some(configs),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Validation(format!("invalid config document: {e}")))
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Internal(e.to_string()))
    }

    /// The one config carried by this document.
    ///
    /// Accepts the single-config shape, or a multi-config document with
    /// exactly one entry.
    pub fn single_config(&self) -> Result<&Config, CoreError> {
        if self.kind.as_deref() == Some(SINGLE_CONFIG_TYPE) {
            if let Some(config) = &self.config {
                return Ok(config);
            }
        }
        match self.configs.as_deref() {
            Some([config]) => Ok(config),
            Some(configs) if configs.len() > 1 => Err(CoreError::Validation(
                "multiple configs found; import them as a batch instead".to_string(),
            )),
            _ => Err(CoreError::Validation("invalid single config file format".to_string())),
        }
    }

    /// All configs of a multi-config document.
    pub fn all_configs(&self) -> Result<&[Config], CoreError> {
        self.configs
            .as_deref()
            .ok_or_else(|| CoreError::Validation("invalid config file format: missing configs".to_string()))
    }
}

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

/// `test-configs-YYYY-MM-DD.json`
pub fn export_all_file_name(date: NaiveDate) -> String {
    format!("test-configs-{}.json", date.format("%Y-%m-%d"))
}

/// `config-{name}-YYYY-MM-DD.json`, non-alphanumerics in the name become `_`.
pub fn export_one_file_name(config_name: &str, date: NaiveDate) -> String {
    format!(
        "config-{}-{}.json",
        sanitize_for_file_name(config_name),
        date.format("%Y-%m-%d")
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
