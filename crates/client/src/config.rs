use std::path::PathBuf;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the `/api/v1` tree.
    pub api_url: String,
    /// Directory of the local last-known-good cache.
    pub cache_dir: PathBuf,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                         |
    /// |-----------------------|---------------------------------|
    /// | `TAGSEL_API_URL`      | `http://localhost:5000/api/v1`  |
    /// | `TAGSEL_CACHE_DIR`    | `.tagsel-cache`                 |
    /// | `TAGSEL_TIMEOUT_SECS` | `10`                            |
    pub fn from_env() -> Self {
        let api_url = std::env::var("TAGSEL_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000/api/v1".into())
            .trim_end_matches('/')
            .to_string();

        let cache_dir = PathBuf::from(std::env::var("TAGSEL_CACHE_DIR").unwrap_or_else(|_| ".tagsel-cache".into()));

        let timeout_secs: u64 = std::env::var("TAGSEL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("TAGSEL_TIMEOUT_SECS must be a valid u64");

        Self {
            api_url,
            cache_dir,
            timeout_secs,
        }
    }
}
