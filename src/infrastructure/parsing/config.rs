//! Parsing configuration for HTML extraction
//!
//! Centralized configuration for CSS selectors and parsing behavior.

use serde::{Deserialize, Serialize};

use crate::infrastructure::config::{defaults, hltb};

/// Main parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Search form endpoint
    pub search_url: String,

    /// Base URL of game detail pages
    pub detail_base_url: String,

    /// Maximum `game_times` list items inspected per page
    pub max_time_entries: usize,

    /// Character offset of the numeric id inside a search result href
    pub id_href_offset: usize,

    /// Selector for the top search result link
    pub search_result_link: String,

    /// Game detail page selectors
    pub game_page_selectors: GamePageSelectors,

    /// Lower-cased text marking a title the source considers endless
    pub endless_marker: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            search_url: hltb::SEARCH_URL.to_string(),
            detail_base_url: hltb::DETAIL_BASE_URL.to_string(),
            max_time_entries: defaults::MAX_TIME_ENTRIES,
            id_href_offset: hltb::ID_HREF_OFFSET,
            search_result_link: "a".to_string(),
            game_page_selectors: GamePageSelectors::default(),
            endless_marker: "flagged as endless".to_string(),
        }
    }
}

impl ParsingConfig {
    /// `{detail_base_url}/{external_id}`
    pub fn detail_url(&self, external_id: i64) -> String {
        format!("{}/{}", self.detail_base_url.trim_end_matches('/'), external_id)
    }
}

/// CSS selectors for game detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePageSelectors {
    /// Title element
    pub profile_header: String,

    /// Headings scanned for the release date label
    pub section_heading: String,

    /// Text that marks the release date heading
    pub release_date_label: String,

    /// List items inside the times container
    pub time_entries: String,

    /// Label element inside a time entry
    pub time_label: String,

    /// Element holding the raw duration text inside a time entry
    pub time_value: String,
}

impl Default for GamePageSelectors {
    fn default() -> Self {
        Self {
            profile_header: ".profile_header".to_string(),
            section_heading: "h5".to_string(),
            release_date_label: "Release Date".to_string(),
            time_entries: ".game_times li".to_string(),
            time_label: "h5".to_string(),
            time_value: "div".to_string(),
        }
    }
}
