//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Polling settings.
    pub poll: PollSettings,
    /// SQLite database URL for the threshold store.
    pub database_url: String,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            database_url: "sqlite://coinwatch.db".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Seconds between poll cycles.
    pub interval_secs: u64,
    /// Number of top listings to fetch each cycle.
    pub top_listings: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            top_listings: 100,
        }
    }
}

impl AppConfig {
    /// Load from a JSON file, falling back to defaults when the file is
    /// absent.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// API credentials, taken from the environment (.env supported) rather than
/// the config file.
#[derive(Clone)]
pub struct Secrets {
    pub telegram_bot_token: String,
    pub cmc_api_key: String,
    pub etherscan_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnv("TELEGRAM_BOT_TOKEN"))?;
        let cmc_api_key =
            std::env::var("CMC_API_KEY").map_err(|_| ConfigError::MissingEnv("CMC_API_KEY"))?;
        let etherscan_api_key = std::env::var("ETHERSCAN_API_KEY").ok();

        Ok(Self {
            telegram_bot_token,
            cmc_api_key,
            etherscan_api_key,
        })
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens stay out of logs
        f.debug_struct("Secrets")
            .field("telegram_bot_token", &"***")
            .field("cmc_api_key", &"***")
            .field("etherscan_api_key", &self.etherscan_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.poll.interval_secs, 300);
        assert_eq!(config.poll.top_listings, 100);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"poll": {"interval_secs": 60}}"#).unwrap();
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.poll.top_listings, 100);
        assert_eq!(config.database_url, "sqlite://coinwatch.db");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("/nonexistent/coinwatch.json").unwrap();
        assert_eq!(config.poll.interval_secs, 300);
    }

    #[test]
    fn secrets_debug_redacts_tokens() {
        let secrets = Secrets {
            telegram_bot_token: "123:supersecret".into(),
            cmc_api_key: "cmc-supersecret".into(),
            etherscan_api_key: Some("gas-supersecret".into()),
        };
        let debug = format!("{secrets:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("***"));
    }
}
