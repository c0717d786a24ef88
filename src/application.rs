//! Application layer: the scrape-and-impute use cases
//!
//! The resolver maps titles to source ids, the scraper turns detail pages
//! into duration tiers, the imputation engine fills what could not be
//! scraped, and the orchestrator drives all three over a catalog.

pub mod imputation;
pub mod orchestrator;
pub mod page_scraper;
pub mod title_resolver;

pub use imputation::{GenreStatistic, GenreStatistics, ImputationEngine, ImputationSummary};
pub use orchestrator::{EntryFailure, ErrorCollector, Orchestrator, RefreshReport, RefreshRequest};
pub use page_scraper::GamePageScraper;
pub use title_resolver::{TitleResolver, normalize_title};
