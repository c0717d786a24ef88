//! Domain module - catalog entities and collaborator contracts
//!
//! This module contains the catalog entry model, the composite storage key,
//! the fault taxonomy, and the traits the pipeline uses to talk to the
//! outside world (HTTP, storage, error reporting).

pub mod catalog_entry;
pub mod collaborators;
pub mod entry_key;
pub mod errors;
pub mod suggestion;

// Re-export commonly used items for convenience
pub use catalog_entry::{
    CatalogEntry, Classification, DurationTier, NOT_FOUND_ID, UNKNOWN_GENRE,
};
pub use collaborators::{CatalogStore, EntryErrorHandler, HttpFetcher};
pub use entry_key::{EntryKey, BUCKET_COUNT, CATEGORY_PREFIX};
pub use errors::{Cancelled, ImputationError, PipelineError, ScrapeError, ScrapeResult};
pub use suggestion::{SuggestionKind, SuggestionRecord};
