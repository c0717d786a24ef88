//! Detail page scraping
//!
//! Fetch and parse run inside one retried operation, so a half-rendered page
//! (blank title, missing times list) is fetched again rather than surfaced.
//! The entry is only touched after a page parsed successfully.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{CatalogEntry, HttpFetcher, ScrapeError, ScrapeResult, SuggestionRecord};
use crate::infrastructure::parsing::{GamePage, GamePageParser, HtmlParser, ParsingConfig};
use crate::infrastructure::retry_manager::RetryExecutor;

pub struct GamePageScraper {
    fetcher: Arc<dyn HttpFetcher>,
    retry: RetryExecutor,
    parser: GamePageParser,
    config: ParsingConfig,
}

impl GamePageScraper {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, retry: RetryExecutor, config: &ParsingConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            retry,
            parser: GamePageParser::new(config)?,
            config: config.clone(),
        })
    }

    /// Fetch and parse the detail page for `external_id`
    pub async fn fetch_page(&self, external_id: i64, cancellation_token: &CancellationToken) -> ScrapeResult<GamePage> {
        let url = self.config.detail_url(external_id);
        let url = url.as_str();
        let fetcher = self.fetcher.as_ref();
        let parser = &self.parser;

        self.retry
            .execute(
                || async move {
                    let body = fetcher.get(url, cancellation_token).await?;
                    parser.parse(&body)
                },
                ScrapeError::is_transient,
                cancellation_token,
            )
            .await
    }

    /// Scrape `entry` in place.
    ///
    /// Sets the external name, the release date when the page has one, and the
    /// three tiers. A page flagged as endless leaves the tiers alone and yields
    /// a suggestion record instead.
    pub async fn scrape(
        &self,
        entry: &mut CatalogEntry,
        cancellation_token: &CancellationToken,
    ) -> ScrapeResult<Option<SuggestionRecord>> {
        if !entry.is_resolved() {
            return Err(ScrapeError::format(format!(
                "entry {} has no external id to scrape",
                entry.id
            )));
        }

        let page = self.fetch_page(entry.external_id, cancellation_token).await?;
        debug!(
            "Scraped '{}' ({}): {:?}",
            page.name, entry.external_id, page.times
        );

        entry.external_name = Some(page.name);
        if page.release_date.is_some() {
            entry.release_date = page.release_date;
        }

        if page.endless {
            info!("♾️ '{}' is flagged as endless, queueing suggestion", entry.name);
            return Ok(Some(SuggestionRecord::endless(
                entry.external_id,
                entry.id,
                &entry.name,
            )));
        }

        entry.set_scraped_tiers(page.times.main, page.times.extras, page.times.completionist);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DurationTier, SuggestionKind};
    use crate::test_utils::{StaticFetcher, detail_url, fast_retry_policy, fixtures};
    use chrono::{Datelike, NaiveDate};

    fn scraper(fetcher: Arc<StaticFetcher>) -> GamePageScraper {
        GamePageScraper::new(
            fetcher,
            RetryExecutor::new(fast_retry_policy()),
            &ParsingConfig::default(),
        )
        .unwrap()
    }

    fn resolved(id: u64, name: &str, external_id: i64) -> CatalogEntry {
        let mut entry = CatalogEntry::new(id, name);
        entry.external_id = external_id;
        entry
    }

    #[tokio::test]
    async fn test_scrape_sets_tiers_name_and_date() {
        let fetcher = Arc::new(StaticFetcher::new().with_game(7231, fixtures::portal_page()));
        let mut entry = resolved(400, "Portal", 7231);

        let suggestion = scraper(fetcher)
            .scrape(&mut entry, &CancellationToken::new())
            .await
            .unwrap();

        assert!(suggestion.is_none());
        assert_eq!(entry.external_name.as_deref(), Some("Portal"));
        assert_eq!(entry.release_date.map(|d| d.year()), Some(2007));
        assert!(entry.is_fully_measured());
        assert_eq!(entry.completionist, DurationTier::scraped(630));
    }

    #[tokio::test]
    async fn test_half_rendered_page_is_retried() {
        let blank = fixtures::game_page("", None, &[("Main Story", "3 Hours")]);
        let fetcher = Arc::new(StaticFetcher::new().with_responses(
            detail_url(7231),
            vec![
                Ok(blank),
                Err(ScrapeError::transient("HTTP 503")),
                Ok(fixtures::portal_page()),
            ],
        ));
        let mut entry = resolved(400, "Portal", 7231);

        scraper(fetcher.clone())
            .scrape(&mut entry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetcher.get_calls(), 3);
        assert!(entry.is_fully_measured());
    }

    #[tokio::test]
    async fn test_format_fault_leaves_entry_untouched() {
        let broken = fixtures::game_page("Portal", None, &[("Main Story", "a while")]);
        let fetcher = Arc::new(StaticFetcher::new().with_game(7231, broken));
        let mut entry = resolved(400, "Portal", 7231);
        let before = entry.clone();

        let result = scraper(fetcher.clone()).scrape(&mut entry, &CancellationToken::new()).await;

        assert!(matches!(result, Err(ScrapeError::Format { .. })));
        assert_eq!(fetcher.get_calls(), 1);
        assert_eq!(entry, before);
    }

    #[tokio::test]
    async fn test_endless_page_emits_one_suggestion_and_keeps_tiers() {
        let fetcher = Arc::new(StaticFetcher::new().with_game(27, fixtures::endless_page("Minecraft")));
        let mut entry = resolved(5, "Minecraft", 27);
        entry.set_scraped_tiers(6000, 0, 0);
        let tiers_before = [entry.main, entry.extras, entry.completionist];

        let suggestion = scraper(fetcher)
            .scrape(&mut entry, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(suggestion.kind, SuggestionKind::Endless);
        assert_eq!(suggestion.external_id, 27);
        assert_eq!(suggestion.entry_id, 5);
        assert_eq!([entry.main, entry.extras, entry.completionist], tiers_before);
    }

    #[tokio::test]
    async fn test_endless_page_without_times_is_fetched_once() {
        let fetcher = Arc::new(
            StaticFetcher::new().with_game(27, fixtures::endless_page_without_times("Minecraft")),
        );
        let mut entry = resolved(5, "Minecraft", 27);

        let suggestion = scraper(fetcher.clone())
            .scrape(&mut entry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(suggestion.map(|s| s.kind), Some(SuggestionKind::Endless));
        assert_eq!(fetcher.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_release_section_keeps_known_date() {
        let page = fixtures::game_page("Portal", None, &[("Main Story", "3 Hours")]);
        let fetcher = Arc::new(StaticFetcher::new().with_game(7231, page));
        let mut entry = resolved(400, "Portal", 7231);
        entry.release_date = NaiveDate::from_ymd_opt(2007, 10, 10);

        scraper(fetcher).scrape(&mut entry, &CancellationToken::new()).await.unwrap();
        assert_eq!(entry.release_date, NaiveDate::from_ymd_opt(2007, 10, 10));
        assert!(entry.extras.imputed);
    }

    #[tokio::test]
    async fn test_unresolved_entry_rejected() {
        let fetcher = Arc::new(StaticFetcher::new());
        let mut entry = CatalogEntry::new(1, "Unknown");
        let result = scraper(fetcher.clone()).scrape(&mut entry, &CancellationToken::new()).await;

        assert!(matches!(result, Err(ScrapeError::Format { .. })));
        assert_eq!(fetcher.get_calls(), 0);
    }
}
