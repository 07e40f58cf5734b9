//! Configuration management for ytmeta
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::utils::retry::RetryConfig;

/// Default platform origin
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP transport configuration
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// Maximum retry attempts per request
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Fixed user agent; a rotating browser agent is used when unset
    pub user_agent: Option<String>,

    /// Platform origin, overridable for mock servers
    pub base_url: String,

    /// Interface language sent with every request
    pub language: String,

    /// Region sent with every request
    pub region: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            max_retries: 3,
            base_delay_ms: 1000,
            request_timeout_secs: 30,
            user_agent: None,
            base_url: String::from(DEFAULT_BASE_URL),
            language: String::from("en"),
            region: String::from("US"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl FetcherConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy derived from this configuration
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_delays(self.max_retries, self.base_delay_ms, 30_000)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = FetcherConfig::default();

        let requests_per_second = std::env::var("YTMETA_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.requests_per_second);

        let max_retries = std::env::var("YTMETA_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);

        let request_timeout_secs = std::env::var("YTMETA_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let user_agent = std::env::var("YTMETA_USER_AGENT").ok();

        let base_url = std::env::var("YTMETA_BASE_URL").unwrap_or(defaults.base_url);

        let language = std::env::var("YTMETA_LANGUAGE").unwrap_or(defaults.language);

        let region = std::env::var("YTMETA_REGION").unwrap_or(defaults.region);

        let log_level = std::env::var("YTMETA_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("YTMETA_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            fetcher: FetcherConfig {
                requests_per_second,
                max_retries,
                base_delay_ms: defaults.base_delay_ms,
                request_timeout_secs,
                user_agent,
                base_url,
                language,
                region,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if self.fetcher.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        Url::parse(&self.fetcher.base_url)
            .with_context(|| format!("base_url is not a valid URL: {}", self.fetcher.base_url))?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }
}
