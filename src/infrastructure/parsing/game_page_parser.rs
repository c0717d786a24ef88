//! Game detail page parser
//!
//! Extracts the title, the earliest regional release date, and the three
//! duration tiers from a detail page. Pages come in several layouts: the
//! classic main/extras/completionist list, multiplayer-only lists (co-op,
//! vs.), and a combined single-player entry carrying a main..extras range.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::HtmlParser;
use super::config::ParsingConfig;
use super::duration::parse_duration_range;
use super::error::{ParsingError, ParsingResult};

static REGION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,4}\s*:\s*").unwrap_or_else(|e| panic!("invalid region pattern: {e}"))
});

static BARE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}$").unwrap_or_else(|e| panic!("invalid year pattern: {e}")));

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%Y-%m-%d"];
const MONTH_YEAR_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

/// Consolidated duration tiers in minutes; zero means "not on the page"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTimes {
    pub main: u32,
    pub extras: u32,
    pub completionist: u32,
}

/// Everything the scraper takes from one detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePage {
    pub name: String,
    pub release_date: Option<NaiveDate>,
    pub times: GameTimes,
    /// Page carries the endless marker
    pub endless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeLabel {
    MainStory,
    MainExtras,
    Completionist,
    Solo,
    CoOp,
    Versus,
    SinglePlayer,
}

impl TimeLabel {
    fn from_heading(heading: &str) -> Option<Self> {
        let normalized = heading.trim().to_lowercase();
        match normalized.trim_end_matches(':') {
            "main story" => Some(Self::MainStory),
            "main + extras" | "main+extras" => Some(Self::MainExtras),
            "completionist" => Some(Self::Completionist),
            "solo" => Some(Self::Solo),
            "co-op" | "coop" => Some(Self::CoOp),
            "vs." | "vs" => Some(Self::Versus),
            "single-player" | "single player" => Some(Self::SinglePlayer),
            _ => None,
        }
    }
}

/// Per-label values before consolidation
#[derive(Debug, Default)]
struct RawTimes {
    labels_found: usize,
    main: u32,
    extras: u32,
    completionist: u32,
    solo: u32,
    coop: u32,
    versus: u32,
    single_player: (u32, u32),
}

impl RawTimes {
    fn record(&mut self, label: TimeLabel, (low, high): (u32, u32)) {
        self.labels_found += 1;
        match label {
            TimeLabel::MainStory => self.main = low,
            TimeLabel::MainExtras => self.extras = low,
            TimeLabel::Completionist => self.completionist = low,
            TimeLabel::Solo => self.solo = low,
            TimeLabel::CoOp => self.coop = low,
            TimeLabel::Versus => self.versus = low,
            TimeLabel::SinglePlayer => self.single_player = (low, high),
        }
    }

    fn consolidate(&self) -> GameTimes {
        let (sp_main, sp_extras) = self.single_player;
        GameTimes {
            main: self.main.max(sp_main).max(self.solo),
            extras: if sp_extras > sp_main {
                sp_extras
            } else {
                self.extras
            },
            completionist: self.completionist,
        }
    }
}

/// Parser for game detail pages
pub struct GamePageParser {
    profile_header: Selector,
    section_heading: Selector,
    time_entries: Selector,
    time_label: Selector,
    time_value: Selector,
    release_date_label: String,
    endless_marker: String,
    max_time_entries: usize,
}

impl GamePageParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let selectors = &config.game_page_selectors;
        let compile = |css: &str| {
            Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {}", css, e))
        };

        Ok(Self {
            profile_header: compile(&selectors.profile_header)?,
            section_heading: compile(&selectors.section_heading)?,
            time_entries: compile(&selectors.time_entries)?,
            time_label: compile(&selectors.time_label)?,
            time_value: compile(&selectors.time_value)?,
            release_date_label: selectors.release_date_label.to_lowercase(),
            endless_marker: config.endless_marker.to_lowercase(),
            max_time_entries: config.max_time_entries,
        })
    }

    fn extract_name(&self, document: &Html) -> ParsingResult<String> {
        let name = document
            .select(&self.profile_header)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .unwrap_or_default();

        if name.is_empty() {
            return Err(ParsingError::transient("profile header missing or blank"));
        }
        Ok(name)
    }

    /// Earliest date listed after the release date heading
    fn extract_release_date(&self, document: &Html) -> Option<NaiveDate> {
        let heading = document.select(&self.section_heading).find(|h| {
            h.text()
                .collect::<String>()
                .to_lowercase()
                .contains(&self.release_date_label)
        })?;

        let mut fragments = Vec::new();
        for node in heading.next_siblings() {
            if let Some(element) = ElementRef::wrap(node) {
                if element.value().name() == heading.value().name() {
                    break;
                }
                fragments.extend(element.text().map(str::to_string));
            } else if let Some(text) = node.value().as_text() {
                fragments.push(text.trim().to_string());
            }
        }

        fragments
            .iter()
            .map(|fragment| fragment.trim())
            .filter(|fragment| !fragment.is_empty())
            .filter_map(parse_release_fragment)
            .min()
    }

    /// Endless pages may carry no time labels at all; they yield zero tiers.
    fn extract_times(&self, document: &Html, endless: bool) -> ParsingResult<GameTimes> {
        let mut raw = RawTimes::default();

        for entry in document.select(&self.time_entries).take(self.max_time_entries) {
            let Some(label) = entry
                .select(&self.time_label)
                .next()
                .and_then(|h| TimeLabel::from_heading(&h.text().collect::<String>()))
            else {
                continue;
            };

            let value_text = entry
                .select(&self.time_value)
                .next()
                .map(|v| collapse_whitespace(&v.text().collect::<String>()))
                .unwrap_or_default();

            let range = parse_duration_range(&value_text)?;
            trace!("⏱️ {:?} = {:?} ('{}')", label, range, value_text);
            raw.record(label, range);
        }

        if raw.labels_found == 0 {
            if endless {
                return Ok(GameTimes::default());
            }
            return Err(ParsingError::transient("no duration labels on page"));
        }
        debug!(
            "Raw times: main={} extras={} completionist={} solo={} coop={} vs={} single_player={:?}",
            raw.main, raw.extras, raw.completionist, raw.solo, raw.coop, raw.versus, raw.single_player
        );
        Ok(raw.consolidate())
    }

    fn is_endless(&self, document: &Html) -> bool {
        document
            .root_element()
            .text()
            .collect::<String>()
            .to_lowercase()
            .contains(&self.endless_marker)
    }
}

impl HtmlParser for GamePageParser {
    type Output = GamePage;

    fn parse(&self, html: &str) -> ParsingResult<GamePage> {
        let document = Html::parse_document(html);

        let name = self.extract_name(&document)?;
        let release_date = self.extract_release_date(&document);
        let endless = self.is_endless(&document);
        let times = self.extract_times(&document, endless)?;

        Ok(GamePage {
            name,
            release_date,
            times,
            endless,
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse one release-date fragment such as `NA: October 10, 2007` or `2008`
fn parse_release_fragment(fragment: &str) -> Option<NaiveDate> {
    let text = REGION_PREFIX.replace(fragment, "");
    let text = collapse_whitespace(&text);

    if BARE_YEAR.is_match(&text) {
        let year = text.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
        .or_else(|| {
            // "October 2007" has no day; treat it as the first of the month
            let with_day = format!("1 {text}");
            MONTH_YEAR_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(&with_day, format).ok())
        })
}
