//! Title resolution against the source's search endpoint
//!
//! The first hit wins. When the verbatim title finds nothing, the search is
//! repeated once with every non-alphanumeric character replaced by a space.
//! No hit at all is a normal outcome and yields [`NOT_FOUND_ID`].

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{HttpFetcher, NOT_FOUND_ID, ScrapeError, ScrapeResult};
use crate::infrastructure::parsing::{HtmlParser, ParsingConfig, SearchResultParser};
use crate::infrastructure::retry_manager::RetryExecutor;

/// Replace every non-alphanumeric character with a space
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

pub struct TitleResolver {
    fetcher: Arc<dyn HttpFetcher>,
    retry: RetryExecutor,
    parser: SearchResultParser,
    search_url: String,
}

impl TitleResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, retry: RetryExecutor, config: &ParsingConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            retry,
            parser: SearchResultParser::new(config)?,
            search_url: config.search_url.clone(),
        })
    }

    /// External id of the top search hit, or [`NOT_FOUND_ID`]
    pub async fn resolve(&self, title: &str, cancellation_token: &CancellationToken) -> ScrapeResult<i64> {
        if title.trim().is_empty() {
            debug!("Skipping search for blank title");
            return Ok(NOT_FOUND_ID);
        }

        if let Some(id) = self.search(title, cancellation_token).await? {
            return Ok(id);
        }

        let normalized = normalize_title(title);
        if normalized != title && !normalized.trim().is_empty() {
            debug!("No results for '{}', retrying as '{}'", title, normalized);
            if let Some(id) = self.search(&normalized, cancellation_token).await? {
                return Ok(id);
            }
        }

        info!("🔍 No search results for '{}'", title);
        Ok(NOT_FOUND_ID)
    }

    async fn search(&self, query: &str, cancellation_token: &CancellationToken) -> ScrapeResult<Option<i64>> {
        let form = [
            ("queryString", query),
            ("t", "games"),
            ("sorthead", "popular"),
            ("sortd", "0"),
        ];
        let form = &form[..];
        let url = self.search_url.as_str();
        let fetcher = self.fetcher.as_ref();
        let parser = &self.parser;

        self.retry
            .execute(
                || async move {
                    let body = fetcher.post_form(url, form, cancellation_token).await?;
                    parser.parse(&body)
                },
                ScrapeError::is_transient,
                cancellation_token,
            )
            .await
    }
}
