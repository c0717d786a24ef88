//! Infrastructure layer: HTTP access, HTML parsing, storage and runtime plumbing
//!
//! Concrete implementations of the domain collaborator traits, plus the retry
//! executor, configuration loading and logging setup used by the pipeline.

pub mod catalog_cache; // Snapshot cache with explicit start/stop
pub mod catalog_store; // In-memory key-value catalog
pub mod config; // Layered configuration
pub mod http_client; // reqwest + governor fetcher
pub mod logging;
pub mod parsing; // Search result and game page parsers
pub mod retry_manager; // Jittered exponential backoff

// Re-export commonly used items
pub use catalog_cache::CatalogCache;
pub use catalog_store::InMemoryCatalogStore;
pub use config::{AppConfig, ConfigError, defaults, hltb};
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{GamePage, GamePageParser, ParsingConfig, ParsingError, ParsingResult, SearchResultParser};
pub use retry_manager::{RetryExecutor, RetryPolicy};
