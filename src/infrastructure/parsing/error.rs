//! Parser errors share the pipeline's fault taxonomy
//!
//! A parser reports a half-rendered page as `Transient` and a changed markup
//! contract as `Format`, so its result can feed the retry executor directly.

pub use crate::domain::errors::ScrapeError as ParsingError;

pub type ParsingResult<T> = Result<T, ParsingError>;
