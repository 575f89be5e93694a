//! Configuration handling for the extractor.
//!
//! Every tunable constant of the extraction subsystem lives here so callers
//! (the binary, the feed-refresh pipeline, tests) can override them without
//! touching code. `Config::from_env` reads the environment with the same
//! defaults `Config::default` uses.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::extractor::gibberish::Thresholds;
use crate::retry::RetryPolicy;

/// Environment variable names. Public so tests and scripts can refer to them.
pub const ENV_MAX_PAGES: &str = "FEEDTEXT_MAX_PAGES";
pub const ENV_MIN_CONTENT_LENGTH: &str = "FEEDTEXT_MIN_CONTENT_LENGTH";
pub const ENV_RETRY_ATTEMPTS: &str = "FEEDTEXT_RETRY_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "FEEDTEXT_RETRY_BASE_DELAY_MS";
pub const ENV_MAX_BODY_BYTES: &str = "FEEDTEXT_MAX_BODY_BYTES";
pub const ENV_USER_AGENT: &str = "FEEDTEXT_USER_AGENT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "FEEDTEXT_REQUEST_TIMEOUT_SECS";

/// Defaults used when environment variables are absent.
pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 100;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_BODY_BYTES: u64 = 50 * 1024 * 1024; // 50MB
pub const DEFAULT_USER_AGENT: &str = "FeedTextBot/0.1 (+https://feedtext.example.com)";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP settings shared by page and document fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Extraction runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    max_pages: usize,
    min_content_length: usize,
    thresholds: Thresholds,
    retry: RetryPolicy,
    fetch: FetchConfig,
}

impl Config {
    pub fn new(
        max_pages: usize,
        min_content_length: usize,
        thresholds: Thresholds,
        retry: RetryPolicy,
        fetch: FetchConfig,
    ) -> Self {
        Self {
            max_pages,
            min_content_length,
            thresholds,
            retry,
            fetch,
        }
    }

    /// Load from environment variables, falling back to the defaults.
    ///
    /// Fails only when a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_pages = parse_env(ENV_MAX_PAGES, "max_pages", DEFAULT_MAX_PAGES)?;
        let min_content_length = parse_env(
            ENV_MIN_CONTENT_LENGTH,
            "min_content_length",
            DEFAULT_MIN_CONTENT_LENGTH,
        )?;
        let attempts = parse_env(ENV_RETRY_ATTEMPTS, "retry_attempts", DEFAULT_RETRY_ATTEMPTS)?;
        let base_delay_ms = parse_env(
            ENV_RETRY_BASE_DELAY_MS,
            "retry_base_delay_ms",
            DEFAULT_RETRY_BASE_DELAY_MS,
        )?;
        let max_body_bytes =
            parse_env(ENV_MAX_BODY_BYTES, "max_body_bytes", DEFAULT_MAX_BODY_BYTES)?;
        let timeout_secs = parse_env(
            ENV_REQUEST_TIMEOUT_SECS,
            "request_timeout_secs",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let user_agent =
            env::var(ENV_USER_AGENT).unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        if max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_pages",
                reason: "must be at least 1".to_string(),
            });
        }
        if attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            max_pages,
            min_content_length,
            thresholds: Thresholds::default(),
            retry: RetryPolicy::new(attempts, Duration::from_millis(base_delay_ms)),
            fetch: FetchConfig {
                user_agent,
                request_timeout: Duration::from_secs(timeout_secs),
                max_body_bytes,
                ..FetchConfig::default()
            },
        })
    }

    /// Maximum number of pages a page-walk backend visits.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }
    /// Minimum character count for a candidate to be accepted outright.
    pub fn min_content_length(&self) -> usize {
        self.min_content_length
    }
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
    pub fn fetch(&self) -> &FetchConfig {
        &self.fetch
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_PAGES,
            DEFAULT_MIN_CONTENT_LENGTH,
            Thresholds::default(),
            RetryPolicy::default(),
            FetchConfig::default(),
        )
    }
}

fn parse_env<T>(key: &str, field: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field,
                reason: format!("{raw:?}: {e}"),
            }),
        Err(_) => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
