//! Search results fragment parser
//!
//! The search endpoint answers with an HTML fragment; the first anchor is the
//! top hit and its `href` carries the numeric id at a fixed offset.

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};
use tracing::debug;

use super::HtmlParser;
use super::config::ParsingConfig;
use super::error::{ParsingError, ParsingResult};

pub struct SearchResultParser {
    link_selector: Selector,
    id_href_offset: usize,
}

impl SearchResultParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let link_selector = Selector::parse(&config.search_result_link)
            .map_err(|e| anyhow!("Invalid selector '{}': {}", config.search_result_link, e))?;

        Ok(Self {
            link_selector,
            id_href_offset: config.id_href_offset,
        })
    }

    fn extract_id(&self, href: &str) -> ParsingResult<i64> {
        let suffix = href.get(self.id_href_offset..).ok_or_else(|| {
            ParsingError::format(format!(
                "result link '{}' shorter than id offset {}",
                href, self.id_href_offset
            ))
        })?;

        suffix.trim().parse::<i64>().map_err(|e| {
            ParsingError::format(format!("result link '{href}' has no numeric id suffix: {e}"))
        })
    }
}

impl HtmlParser for SearchResultParser {
    /// `None` when the fragment holds no result
    type Output = Option<i64>;

    fn parse(&self, html: &str) -> ParsingResult<Self::Output> {
        let fragment = Html::parse_fragment(html);
        let Some(anchor) = fragment.select(&self.link_selector).next() else {
            debug!("Search returned no results");
            return Ok(None);
        };

        let href = anchor
            .value()
            .attr("href")
            .ok_or_else(|| ParsingError::format("top search result has no href"))?;

        self.extract_id(href).map(Some)
    }
}
