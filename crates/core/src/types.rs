/// Feature and sub-feature identifiers are free-form strings from the catalog.
pub type FeatureId = String;

/// Saved config identifiers are time-ordered UUID strings.
pub type ConfigId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a new time-ordered identifier (UUID v7).
///
/// Sorting these lexicographically sorts them by creation time.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
