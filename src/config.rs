use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CAPTIONS_URL: &str = "https://youtube-transcript3.p.rapidapi.com";
pub const DEFAULT_CAPTIONS_HOST: &str = "youtube-transcript3.p.rapidapi.com";

pub const COMPLETION_KEY_ENV: &str = "OPENAI_API_KEY";
pub const CAPTIONS_KEY_ENV: &str = "RAPIDAPI_KEY";
pub const FAVORITES_AUTH_ENV: &str = "FIREBASE_AUTH";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    pub completion_url: Option<String>,
    pub completion_model: Option<String>,
    pub captions_url: Option<String>,
    pub captions_host: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub stop_on_permanent: Option<bool>,
    /// Realtime database root; favorites stay in memory when unset
    pub favorites_url: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytpost/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Load config from an explicit path; a missing file is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    pub fn completion_url(&self) -> &str {
        self.completion_url.as_deref().unwrap_or(DEFAULT_COMPLETION_URL)
    }

    pub fn completion_model(&self) -> &str {
        self.completion_model.as_deref().unwrap_or(DEFAULT_COMPLETION_MODEL)
    }

    pub fn captions_url(&self) -> &str {
        self.captions_url.as_deref().unwrap_or(DEFAULT_CAPTIONS_URL)
    }

    pub fn captions_host(&self) -> &str {
        self.captions_host.as_deref().unwrap_or(DEFAULT_CAPTIONS_HOST)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_retries.unwrap_or(default.max_attempts),
            delay: self.retry_delay_ms.map(Duration::from_millis).unwrap_or(default.delay),
            stop_on_permanent: self.stop_on_permanent.unwrap_or(default.stop_on_permanent),
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytpost")
        .join("config.toml")
}

/// Read a secret from the environment, treating an empty value as unset
pub fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
bind = "0.0.0.0:8080"
completion_model = "gpt-4o-mini"
captions_url = "http://localhost:9000"
max_retries = 5
retry_delay_ms = 250
stop_on_permanent = true
favorites_url = "https://example-default-rtdb.firebaseio.com"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind(), "0.0.0.0:8080");
        assert_eq!(config.completion_model(), "gpt-4o-mini");
        assert_eq!(config.captions_url(), "http://localhost:9000");
        assert_eq!(config.captions_host(), DEFAULT_CAPTIONS_HOST);
        assert_eq!(
            config.favorites_url.as_deref(),
            Some("https://example-default-rtdb.firebaseio.com")
        );

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert!(policy.stop_on_permanent);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bind(), DEFAULT_BIND);
        assert_eq!(config.completion_url(), DEFAULT_COMPLETION_URL);
        assert_eq!(config.completion_model(), DEFAULT_COMPLETION_MODEL);
        assert!(config.favorites_url.is_none());

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert!(!policy.stop_on_permanent);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"max_retries = 1"#).unwrap();
        assert_eq!(config.retry_policy().max_attempts, 1);
        assert_eq!(config.retry_policy().delay, Duration::from_secs(1));
    }

    #[test]
    fn test_load_from_missing_path() {
        assert!(Config::load_from(Path::new("/nonexistent/ytpost/config.toml")).is_err());
    }
}
