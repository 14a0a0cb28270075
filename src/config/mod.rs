//! Configuration management for the comment collector
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Error;
use crate::models::{Credential, SortOrder};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collector configuration
    pub collector: CollectorConfig,

    /// Remote API configuration
    pub api: ApiConfig,

    /// Optional login cookies
    pub credential: CredentialConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Pagination and politeness settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Maximum number of page fetches in flight
    pub max_concurrent_requests: usize,

    /// Delay each fetch waits before issuing its call (milliseconds)
    pub pace_delay_ms: u64,

    /// Rate limit (requests per second)
    pub rate_limit: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Top-level comments per page, as documented by the API
    pub page_size: u32,

    /// Pages fetched when the caller does not choose
    pub default_pages: u32,

    /// Reply sort order
    pub sort: SortOrder,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API host
    pub base_url: String,

    /// Fixed user agent; rotated from a built-in pool when unset
    pub user_agent: Option<String>,

    /// Referer header sent with every request
    pub referer: String,
}

/// Login cookies (all optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub sessdata: Option<String>,
    pub bili_jct: Option<String>,
    pub buvid3: Option<String>,
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

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            pace_delay_ms: 50,
            rate_limit: 10,
            request_timeout_secs: 10,
            page_size: 20,
            default_pages: 5,
            sort: SortOrder::Time,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.bilibili.com"),
            user_agent: None,
            referer: String::from("https://www.bilibili.com"),
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

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = CollectorConfig::default();

        let max_concurrent_requests = env_parse("BILI_COMMENTS_MAX_CONCURRENT_REQUESTS")
            .unwrap_or(defaults.max_concurrent_requests);
        let pace_delay_ms = env_parse("BILI_COMMENTS_PACE_DELAY_MS").unwrap_or(defaults.pace_delay_ms);
        let rate_limit = env_parse("BILI_COMMENTS_RATE_LIMIT").unwrap_or(defaults.rate_limit);
        let request_timeout_secs =
            env_parse("BILI_COMMENTS_REQUEST_TIMEOUT").unwrap_or(defaults.request_timeout_secs);
        let page_size = env_parse("BILI_COMMENTS_PAGE_SIZE").unwrap_or(defaults.page_size);
        let default_pages = env_parse("BILI_COMMENTS_DEFAULT_PAGES").unwrap_or(defaults.default_pages);
        let sort = std::env::var("BILI_COMMENTS_SORT")
            .ok()
            .and_then(|v| SortOrder::parse(&v))
            .unwrap_or(defaults.sort);

        let base_url = std::env::var("BILI_COMMENTS_API_BASE")
            .unwrap_or_else(|_| ApiConfig::default().base_url);
        let user_agent = std::env::var("BILI_COMMENTS_USER_AGENT").ok();

        let log_level =
            std::env::var("BILI_COMMENTS_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format =
            std::env::var("BILI_COMMENTS_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            collector: CollectorConfig {
                max_concurrent_requests,
                pace_delay_ms,
                rate_limit,
                request_timeout_secs,
                page_size,
                default_pages,
                sort,
            },
            api: ApiConfig {
                base_url,
                user_agent,
                ..Default::default()
            },
            credential: CredentialConfig {
                sessdata: std::env::var("BILI_COMMENTS_SESSDATA").ok(),
                bili_jct: std::env::var("BILI_COMMENTS_BILI_JCT").ok(),
                buvid3: std::env::var("BILI_COMMENTS_BUVID3").ok(),
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        };

        config.validate().context("Invalid configuration from environment")?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing sections fall back to defaults
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
    pub fn validate(&self) -> crate::error::Result<()> {
        let collector = &self.collector;

        if collector.max_concurrent_requests == 0 {
            return Err(Error::config("max_concurrent_requests must be greater than 0"));
        }

        if collector.pace_delay_ms == 0 {
            return Err(Error::config("pace_delay_ms must be greater than 0"));
        }

        if collector.rate_limit == 0 {
            return Err(Error::config("rate_limit must be positive"));
        }

        if collector.request_timeout_secs == 0 {
            return Err(Error::config("request_timeout_secs must be greater than 0"));
        }

        if collector.page_size == 0 {
            return Err(Error::config("page_size must be greater than 0"));
        }

        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(Error::config(format!(
                "api.base_url is not a valid URL: {}",
                self.api.base_url
            )));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.collector.request_timeout_secs)
    }

    /// Get per-fetch pacing delay as Duration
    #[must_use]
    pub fn pace_delay(&self) -> Duration {
        Duration::from_millis(self.collector.pace_delay_ms)
    }

    /// Credential built from the configured cookies, if a session is set
    pub fn credential(&self) -> Option<Credential> {
        let sessdata = self
            .credential
            .sessdata
            .as_ref()
            .filter(|s| !s.trim().is_empty())?;

        Some(Credential {
            sessdata: sessdata.trim().to_string(),
            bili_jct: self.credential.bili_jct.clone(),
            buvid3: self.credential.buvid3.clone(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
