//! Collaborator traits at the pipeline boundary
//!
//! The pipeline never talks to reqwest or a database directly; it goes through
//! these seams so tests can swap in canned responses and in-memory storage.

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::catalog_entry::CatalogEntry;
use super::errors::{ScrapeError, ScrapeResult};
use super::suggestion::SuggestionRecord;

/// HTTP access to the source site
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET `url` and return the response body
    async fn get(&self, url: &str, cancellation_token: &CancellationToken) -> ScrapeResult<String>;

    /// POST a form-encoded body to `url` and return the response body
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        cancellation_token: &CancellationToken,
    ) -> ScrapeResult<String>;
}

/// Key-value catalog storage
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_measured_entries(&self) -> Result<Vec<CatalogEntry>>;
    async fn replace_entries(&self, entries: Vec<CatalogEntry>) -> Result<()>;
    async fn insert_suggestion(&self, suggestion: SuggestionRecord) -> Result<()>;
}

/// Receives per-entry failures during a batch run
pub trait EntryErrorHandler: Send + Sync {
    fn handle(&self, entry: &CatalogEntry, error: &ScrapeError);
}
