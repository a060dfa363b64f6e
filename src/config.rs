use std::path::PathBuf;
use std::time::Duration;

pub const API_PREFIX: &str = "/api/v1";
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:3001";
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub timeout: Duration,
    pub log_file: PathBuf,
}

impl Config {
    /// Resolve configuration from the environment. `api_url` is the command-line
    /// override and takes precedence over `NOTES_API_URL`.
    pub fn from_env(api_url: Option<&str>) -> Self {
        let explicit = api_url
            .map(str::to_string)
            .or_else(|| std::env::var("NOTES_API_URL").ok())
            .filter(|s| !s.trim().is_empty());
        let origin = std::env::var("NOTES_API_ORIGIN").unwrap_or_else(|_| DEFAULT_API_ORIGIN.to_string());

        let log_file = std::env::var("NOTES_LOG_FILE").map(PathBuf::from).unwrap_or_else(|_| {
            let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home_dir).join(".core-notes.log")
        });

        Config {
            base_url: resolve_base_url(explicit.as_deref(), &origin),
            timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
            log_file,
        }
    }
}

/// An absolute override wins; it gets the `/api/v1` prefix appended unless it
/// already ends with it. Without one, the API lives under `origin`.
pub fn resolve_base_url(explicit: Option<&str>, origin: &str) -> String {
    let raw = explicit.unwrap_or(origin).trim();
    if raw.ends_with(API_PREFIX) {
        raw.to_string()
    } else {
        format!("{}{}", raw.trim_end_matches('/'), API_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_with_prefix_is_kept() {
        assert_eq!(
            resolve_base_url(Some("http://api:3001/api/v1"), DEFAULT_API_ORIGIN),
            "http://api:3001/api/v1"
        );
    }

    #[test]
    fn override_without_prefix_gets_one() {
        assert_eq!(
            resolve_base_url(Some("http://api:3001/"), DEFAULT_API_ORIGIN),
            "http://api:3001/api/v1"
        );
    }

    #[test]
    fn falls_back_to_origin() {
        assert_eq!(resolve_base_url(None, "http://backend:3001"), "http://backend:3001/api/v1");
        assert_eq!(resolve_base_url(None, DEFAULT_API_ORIGIN), "http://localhost:3001/api/v1");
    }
}
