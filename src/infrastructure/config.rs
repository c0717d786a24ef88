//! Configuration infrastructure
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (format picked from the extension), then `TTB__SECTION__KEY` environment
//! variables. The pipeline components only ever see the resolved structs.

#![allow(clippy::uninlined_format_args)]

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::infrastructure::parsing::ParsingConfig;
use crate::infrastructure::retry_manager::RetryPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub retry: RetryConfig,
    pub scraping: ScrapingConfig,
    pub orchestrator: OrchestratorConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Backoff parameters for the retry executor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failed attempt
    pub retry_count: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub delta_backoff_ms: u64,
}

/// Source site endpoints and client behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub search_url: String,
    /// Detail pages live at `{detail_base_url}/{external_id}`
    pub detail_base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    /// How many `game_times` list items are inspected
    pub max_time_entries: usize,
    /// Character offset of the numeric id inside a search result link
    pub id_href_offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Workers per available core
    pub concurrency_factor: usize,
    /// Explicit worker count, overrides the factor
    pub max_workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub refresh_interval_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for daily log files; defaults to the user's data dir
    pub log_directory: Option<PathBuf>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_count: defaults::RETRY_COUNT,
            min_backoff_ms: defaults::MIN_BACKOFF_MS,
            max_backoff_ms: defaults::MAX_BACKOFF_MS,
            delta_backoff_ms: defaults::DELTA_BACKOFF_MS,
        }
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            search_url: hltb::SEARCH_URL.to_string(),
            detail_base_url: hltb::DETAIL_BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            max_time_entries: defaults::MAX_TIME_ENTRIES,
            id_href_offset: hltb::ID_HREF_OFFSET,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency_factor: defaults::CONCURRENCY_FACTOR,
            max_workers: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: defaults::CACHE_REFRESH_INTERVAL_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_directory: None,
        }
    }
}

impl RetryConfig {
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_count: self.retry_count,
            min_backoff: Duration::from_millis(self.min_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            delta_backoff: Duration::from_millis(self.delta_backoff_ms),
        }
    }
}

impl ScrapingConfig {
    pub fn to_parsing_config(&self) -> ParsingConfig {
        ParsingConfig {
            search_url: self.search_url.clone(),
            detail_base_url: self.detail_base_url.clone(),
            max_time_entries: self.max_time_entries,
            id_href_offset: self.id_href_offset,
            ..ParsingConfig::default()
        }
    }
}

impl OrchestratorConfig {
    /// Bounded worker count for the fan-out
    pub fn worker_count(&self) -> usize {
        if let Some(workers) = self.max_workers {
            return workers.max(1);
        }
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        (cores * self.concurrency_factor).max(1)
    }
}

impl CacheConfig {
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

impl AppConfig {
    /// Load defaults, an optional file and `TTB__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        if let Some(path) = path {
            info!("Loaded configuration from: {:?}", path);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.retry_count == 0 {
            return Err(ConfigError::Validation {
                message: "retry.retry_count must be greater than 0".to_string(),
            });
        }
        if self.retry.min_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Validation {
                message: format!(
                    "retry.min_backoff_ms ({}) cannot be greater than retry.max_backoff_ms ({})",
                    self.retry.min_backoff_ms, self.retry.max_backoff_ms
                ),
            });
        }
        for (field, value) in [
            ("scraping.search_url", &self.scraping.search_url),
            ("scraping.detail_base_url", &self.scraping.detail_base_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::Validation {
                message: format!("{} is not a valid URL ({}): {}", field, value, e),
            })?;
        }
        if self.scraping.max_requests_per_second == 0 {
            return Err(ConfigError::Validation {
                message: "scraping.max_requests_per_second must be greater than 0".to_string(),
            });
        }
        if self.scraping.max_time_entries == 0 {
            return Err(ConfigError::Validation {
                message: "scraping.max_time_entries must be greater than 0".to_string(),
            });
        }
        if self.orchestrator.concurrency_factor == 0 && self.orchestrator.max_workers.is_none() {
            return Err(ConfigError::Validation {
                message: "orchestrator.concurrency_factor must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Source site endpoints
pub mod hltb {
    pub const BASE_URL: &str = "https://howlongtobeat.com";

    /// Search form endpoint, answers with an HTML fragment
    pub const SEARCH_URL: &str = "https://howlongtobeat.com/search_results?page=1";

    pub const DETAIL_BASE_URL: &str = "https://howlongtobeat.com/game";

    /// Result links look like `game?id=12345`
    pub const ID_HREF_OFFSET: usize = 8;
}

/// Default configuration values
pub mod defaults {
    pub const ENV_PREFIX: &str = "TTB";

    pub const RETRY_COUNT: u32 = 5;
    pub const MIN_BACKOFF_MS: u64 = 1_000;
    pub const MAX_BACKOFF_MS: u64 = 30_000;
    pub const DELTA_BACKOFF_MS: u64 = 2_000;

    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 5;
    pub const MAX_TIME_ENTRIES: usize = 4;

    pub const CONCURRENCY_FACTOR: usize = 2;

    pub const CACHE_REFRESH_INTERVAL_SECONDS: u64 = 300;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
}
