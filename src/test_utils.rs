//! Test utilities for the catalog pipeline
//!
//! Canned-response HTTP fetcher, HTML fixtures shaped like the source site's
//! markup, and catalog entry builders. Shared by unit tests, the integration
//! tests under `tests/` and the benchmark, so the pipeline can run offline.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{CatalogEntry, Classification, HttpFetcher, ScrapeError, ScrapeResult};
use crate::infrastructure::parsing::ParsingConfig;
use crate::infrastructure::retry_manager::RetryPolicy;

/// Form field carrying the search text
pub const SEARCH_QUERY_FIELD: &str = "queryString";

/// Offline [`HttpFetcher`] answering from canned bodies.
///
/// Detail pages are keyed by URL and may be scripted as a sequence (the last
/// response repeats). Searches are keyed by the exact query text; unknown
/// queries get an empty result fragment, unknown URLs a 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, VecDeque<ScrapeResult<String>>>>,
    searches: HashMap<String, String>,
    queries: Mutex<Vec<String>>,
    get_calls: AtomicUsize,
    post_calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GET `url` with `body`
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_responses(url, vec![Ok(body.into())])
    }

    /// Answer GET `url` with each response in turn, repeating the last one
    pub fn with_responses(self, url: impl Into<String>, responses: Vec<ScrapeResult<String>>) -> Self {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.into(), responses.into());
        }
        self
    }

    /// Detail page for `external_id` under the default base URL
    pub fn with_game(self, external_id: i64, body: impl Into<String>) -> Self {
        self.with_page(detail_url(external_id), body)
    }

    /// Search for exactly `query` returns a single hit for `external_id`
    pub fn with_search_hit(mut self, query: &str, title: &str, external_id: i64) -> Self {
        self.searches
            .insert(query.to_string(), fixtures::search_results(&[(title, external_id)]));
        self
    }

    /// Search for exactly `query` returns `body` verbatim
    pub fn with_search_body(mut self, query: &str, body: impl Into<String>) -> Self {
        self.searches.insert(query.to_string(), body.into());
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    /// Search texts in the order they were sent
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpFetcher for StaticFetcher {
    async fn get(&self, url: &str, cancellation_token: &CancellationToken) -> ScrapeResult<String> {
        if cancellation_token.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        let mut pages = self
            .pages
            .lock()
            .map_err(|_| ScrapeError::transient("fixture lock poisoned"))?;
        match pages.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(ScrapeError::transient("empty fixture queue"))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ScrapeError::transient("empty fixture queue"))),
            None => Err(ScrapeError::Request {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn post_form(
        &self,
        _url: &str,
        form: &[(&str, &str)],
        cancellation_token: &CancellationToken,
    ) -> ScrapeResult<String> {
        if cancellation_token.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.post_calls.fetch_add(1, Ordering::SeqCst);

        let query = form
            .iter()
            .find(|(key, _)| *key == SEARCH_QUERY_FIELD)
            .map(|(_, value)| (*value).to_string())
            .unwrap_or_default();
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        Ok(self
            .searches
            .get(&query)
            .cloned()
            .unwrap_or_else(|| fixtures::no_search_results(&query)))
    }
}

/// Detail URL under the default parsing configuration
pub fn detail_url(external_id: i64) -> String {
    ParsingConfig::default().detail_url(external_id)
}

/// Millisecond backoff so retry paths run quickly
pub const fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        retry_count: 3,
        min_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        delta_backoff: Duration::from_millis(1),
    }
}

/// Resolved entry with scraped tiers; a zero tier stays imputed
pub fn measured_entry(
    id: u64,
    genre: &str,
    classification: Classification,
    (main, extras, completionist): (u32, u32, u32),
) -> CatalogEntry {
    let mut entry = CatalogEntry::new(id, format!("Measured {id}"))
        .with_genres([genre])
        .with_classification(classification);
    entry.external_id = id as i64;
    entry.set_scraped_tiers(main, extras, completionist);
    entry
}

/// Freshly discovered entry that still needs resolving and scraping
pub fn unscraped_entry(id: u64, name: &str, genre: &str) -> CatalogEntry {
    CatalogEntry::new(id, name)
        .with_genres([genre])
        .with_classification(Classification::Game)
}

/// HTML shaped like the source site's pages
pub mod fixtures {
    use std::fmt::Write;

    /// Detail page with a profile header, optional release list and a
    /// `game_times` list of `(label, raw text)` items
    pub fn game_page(name: &str, release_dates: Option<&[&str]>, times: &[(&str, &str)]) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html><head><title>How long is it?</title></head><body>\n",
        );
        let _ = writeln!(
            html,
            r#"<div class="profile_header_game"><div class="profile_header shadow_text">{name}</div></div>"#
        );

        if let Some(dates) = release_dates {
            html.push_str(r#"<div class="profile_info"><h5>Release Date(s):</h5><ul>"#);
            for date in dates {
                let _ = write!(html, "<li>{date}</li>");
            }
            html.push_str("</ul></div>\n");
        }

        html.push_str(r#"<div class="game_times"><ul>"#);
        for (label, value) in times {
            let _ = write!(
                html,
                r#"<li class="short time_100"><h5>{label}</h5><div>{value}</div></li>"#
            );
        }
        html.push_str("</ul></div>\n</body></html>");
        html
    }

    pub fn portal_page() -> String {
        game_page(
            "Portal",
            Some(&["NA: October 10, 2007", "EU: October 18, 2007", "JP: 2008"]),
            &[
                ("Main Story", "3 Hours"),
                ("Main + Extras", "4&#189; Hours"),
                ("Completionist", "10&#189; Hours"),
            ],
        )
    }

    /// Multiplayer-only title: no single-player tiers at all
    pub fn spiral_knights_page() -> String {
        game_page(
            "Spiral Knights",
            Some(&["NA: April 4, 2011"]),
            &[("Co-Op", "150 Hours"), ("Vs.", "58 Hours")],
        )
    }

    pub fn endless_page(name: &str) -> String {
        game_page(
            name,
            Some(&["NA: November 18, 2011"]),
            &[("Main Story", "N/A"), ("Main + Extras", "--")],
        )
        .replace(
            "</body>",
            r#"<div class="in back_primary shadow_box">This game has been flagged as Endless.</div></body>"#,
        )
    }

    /// Endless page whose time section lists no labels at all
    pub fn endless_page_without_times(name: &str) -> String {
        game_page(name, None, &[]).replace(
            "</body>",
            r#"<div class="in back_primary shadow_box">This game has been flagged as Endless.</div></body>"#,
        )
    }

    /// Search fragment listing `(title, external_id)` hits in order
    pub fn search_results(hits: &[(&str, i64)]) -> String {
        let mut html = String::from("<h3>We Found Some Results</h3><ul>");
        for (title, id) in hits {
            let _ = write!(
                html,
                r#"<li class="back_darkish"><div class="search_list_image"><a aria-label="{title}" title="{title}" href="game?id={id}"><img alt="Box Art" src="/games/{id}.jpg"></a></div></li>"#
            );
        }
        html.push_str("</ul>");
        html
    }

    pub fn no_search_results(query: &str) -> String {
        format!("<li class=\"global_padding\">No results for <strong>{query}</strong> in <u>games</u>.</li>")
    }
}
