//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default backend API base URL (can be overridden at compile time via QUILL_API_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("QUILL_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000/api/",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Seconds subtracted from an access token's lifetime when checking expiry.
/// Zero means a token is expired exactly at its `exp` claim.
pub const DEFAULT_EXPIRY_LEEWAY_SECS: i64 = 0;

/// Transport timeout for a single backend request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend API base URL, e.g. `http://localhost:8000/api/`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Clock-skew allowance applied to access token expiry checks.
    #[serde(default)]
    pub expiry_leeway_secs: i64,
    /// Per-request transport timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            expiry_leeway_secs: DEFAULT_EXPIRY_LEEWAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Some(log_level) = env_value("QUILL_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(api_url) = env_value("QUILL_API_URL") {
            self.api_base_url = api_url;
        }
        if let Some(leeway) = env_value("QUILL_EXPIRY_LEEWAY_SECS").and_then(|v| v.parse().ok()) {
            self.expiry_leeway_secs = leeway;
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.expiry_leeway_secs < 0 {
            return Err(CoreError::Config(
                "expiry_leeway_secs must not be negative".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.api_base_url().map(|_| ())
    }

    /// Get the API base URL, parsed, with a trailing slash so relative
    /// endpoint paths join underneath it instead of replacing the last segment.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let raw = self.api_base_url.trim();
        if raw.ends_with('/') {
            Ok(Url::parse(raw)?)
        } else {
            Ok(Url::parse(&format!("{}/", raw))?)
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.expiry_leeway_secs, 0);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            expiry_leeway_secs: 15,
            request_timeout_secs: 5,
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.expiry_leeway_secs, 15);
        assert_eq!(loaded.request_timeout_secs, 5);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_api_base_url_gets_trailing_slash() {
        let config = Config {
            api_base_url: "https://blog.example.com/api".to_string(),
            ..Config::default()
        };
        let url = config.api_base_url().unwrap();
        assert_eq!(url.as_str(), "https://blog.example.com/api/");
        assert_eq!(
            url.join("token/refresh/").unwrap().as_str(),
            "https://blog.example.com/api/token/refresh/"
        );
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_base_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(config.api_base_url().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_leeway_rejected() {
        let config = Config {
            expiry_leeway_secs: -5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}
