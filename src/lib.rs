//! ttb-catalog - time-to-beat scraping and imputation for a title catalog
//!
//! Resolves catalog titles against a community time-to-beat site, scrapes the
//! main / extras / completionist durations from detail pages, and fills the
//! gaps from per-genre statistics so every entry ends with ordered tiers.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod test_utils;

pub use application::{Orchestrator, RefreshReport, RefreshRequest};
pub use domain::{CatalogEntry, CatalogStore, HttpFetcher};
pub use infrastructure::AppConfig;
