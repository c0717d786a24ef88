//! HTML parsing for the time-to-beat source site
//!
//! Trait-based parsers over `scraper`: one for the search results fragment,
//! one for game detail pages, plus the duration text grammar they share.

pub mod config;
pub mod duration;
pub mod error;
pub mod game_page_parser;
pub mod search_result_parser;

// Re-export public types
pub use config::{GamePageSelectors, ParsingConfig};
pub use duration::{parse_duration, parse_duration_range};
pub use error::{ParsingError, ParsingResult};
pub use game_page_parser::{GamePage, GamePageParser, GameTimes};
pub use search_result_parser::SearchResultParser;

/// Generic HTML parser trait for type-safe parsing
pub trait HtmlParser {
    type Output;

    /// Parse a raw response body
    fn parse(&self, html: &str) -> ParsingResult<Self::Output>;
}
