//! Fault taxonomy for the scrape-and-impute pipeline
//!
//! `ScrapeError` separates retryable faults from fatal ones; only
//! [`ScrapeError::Transient`] is ever retried. A failed title lookup is not an
//! error at all: the resolver returns [`super::NOT_FOUND_ID`].

use thiserror::Error;

use super::catalog_entry::Classification;

/// Marker returned when a cancellation token fires mid-operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// Network timeout, 5xx, half-rendered page
    #[error("transient fault: {reason}")]
    Transient { reason: String },

    /// The source's markup contract changed
    #[error("format fault: {reason}")]
    Format { reason: String },

    /// Non-retryable HTTP status
    #[error("request rejected with status {status}: {url}")]
    Request { status: u16, url: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format { reason: reason.into() }
    }

    /// Classifier handed to the retry executor
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<Cancelled> for ScrapeError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// No statistic (including the fallback bucket) covers an entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImputationError {
    #[error("no statistic for entry {entry_id} (genre '{genre}', {classification}) and no fallback bucket")]
    MissingStatistic {
        entry_id: u64,
        genre: String,
        classification: Classification,
    },
}

/// Top-level failure of a catalog refresh
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("catalog store failure: {0}")]
    Store(#[from] anyhow::Error),

    #[error(transparent)]
    Imputation(#[from] ImputationError),
}
