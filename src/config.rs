use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Minimum minutes between refreshes. Zero disables the limit.
    #[serde(default = "default_refresh_limit")]
    pub refresh_limit_minutes: u32,

    /// Feed-to-JSON service. When unset, feeds are fetched and parsed directly.
    pub fetch_service_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feed-reconciler");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("reader.db").to_string_lossy().to_string()
}

fn default_refresh_limit() -> u32 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "feed-reconciler/1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            refresh_limit_minutes: default_refresh_limit(),
            fetch_service_url: None,
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feed-reconciler")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = Config::from_toml("refresh_limit_minutes = 0\n").unwrap();

        assert_eq!(config.refresh_limit_minutes, 0);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.user_agent, "feed-reconciler/1.0");
        assert!(config.fetch_service_url.is_none());
        assert!(config.db_path.ends_with("reader.db"));
    }

    #[test]
    fn service_url_is_read() {
        let config = Config::from_toml(
            "fetch_service_url = \"https://api.rss2json.com/v1/api.json\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        assert_eq!(
            config.fetch_service_url.as_deref(),
            Some("https://api.rss2json.com/v1/api.json")
        );
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.refresh_limit_minutes, 30);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Config::from_toml("refresh_limit_minutes = \"soon\"").is_err());
    }
}
