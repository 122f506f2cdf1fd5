//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NEWSDESK_API_URL` - Base URL of the news backend (e.g., `https://api.example.com/`)
//!
//! ## Optional
//! - `NEWSDESK_DATA_DIR` - Directory for the persisted session token
//!   (default: platform data directory)
//! - `NEWSDESK_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `NEWSDESK_CACHE_TTL_SECS` - Article cache lifetime (default: 300)
//! - `NEWSDESK_RELATED_LIMIT` - Related articles per detail view (default: 3)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use thiserror::Error;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_RELATED_LIMIT: usize = 3;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Could not determine a data directory; set NEWSDESK_DATA_DIR")]
    NoDataDir,
}

/// Newsdesk client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, always ending in `/`
    pub api_url: Url,
    /// Explicit data directory; `None` means the platform default
    pub data_dir: Option<PathBuf>,
    /// Per-request timeout
    pub http_timeout: Duration,
    /// Article cache lifetime
    pub cache_ttl: Duration,
    /// Related articles shown per detail view
    pub related_limit: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an absolute
    /// http(s) URL.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url("NEWSDESK_API_URL", api_url)?,
            data_dir: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            related_limit: DEFAULT_RELATED_LIMIT,
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = get("NEWSDESK_API_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("NEWSDESK_API_URL".to_string()))?;

        Ok(Self {
            api_url: parse_api_url("NEWSDESK_API_URL", &raw_url)?,
            data_dir: get("NEWSDESK_DATA_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            http_timeout: Duration::from_secs(parse_or_default(
                &get,
                "NEWSDESK_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            cache_ttl: Duration::from_secs(parse_or_default(
                &get,
                "NEWSDESK_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            related_limit: parse_or_default(&get, "NEWSDESK_RELATED_LIMIT", DEFAULT_RELATED_LIMIT)?,
            sentry_dsn: get("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: get("SENTRY_ENVIRONMENT").filter(|v| !v.is_empty()),
        })
    }

    /// Directory holding the persisted token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoDataDir` if no directory is configured and the
    /// platform has no home directory.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("com", "newsdesk", "newsdesk")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoDataDir)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL, forcing a trailing slash so relative joins keep
/// any path prefix (`https://host/api/` + `auth/me`).
fn parse_api_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_url() {
        let err = ClientConfig::from_source(source(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "NEWSDESK_API_URL"));
    }

    #[test]
    fn test_defaults() {
        let config =
            ClientConfig::from_source(source(&[("NEWSDESK_API_URL", "http://localhost:8000")]))
                .unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.related_limit, 3);
        assert!(config.data_dir.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_path_prefix_gets_trailing_slash() {
        let config = ClientConfig::new("https://news.example.com/api/v1").unwrap();
        assert_eq!(config.api_url.as_str(), "https://news.example.com/api/v1/");
        assert_eq!(
            config.api_url.join("auth/me").unwrap().as_str(),
            "https://news.example.com/api/v1/auth/me"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = ClientConfig::new("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, msg) if msg.contains("ftp")));
    }

    #[test]
    fn test_invalid_number() {
        let err = ClientConfig::from_source(source(&[
            ("NEWSDESK_API_URL", "http://localhost:8000"),
            ("NEWSDESK_RELATED_LIMIT", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "NEWSDESK_RELATED_LIMIT"));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_source(source(&[
            ("NEWSDESK_API_URL", "http://localhost:8000/"),
            ("NEWSDESK_DATA_DIR", "/tmp/newsdesk"),
            ("NEWSDESK_HTTP_TIMEOUT_SECS", "3"),
            ("NEWSDESK_CACHE_TTL_SECS", " 0 "),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(
            config.resolve_data_dir().unwrap(),
            PathBuf::from("/tmp/newsdesk")
        );
        assert!(config.sentry_dsn.is_none());
    }
}
