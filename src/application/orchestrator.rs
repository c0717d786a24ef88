//! Catalog refresh orchestration
//!
//! Fans out resolve+scrape over the entries that need it with a bounded
//! number of concurrent workers, isolates per-entry failures through an
//! injected [`EntryErrorHandler`], then recomputes genre statistics and
//! imputes over the whole catalog once every worker has finished.
//!
//! Each worker owns its entry for the duration of the task, so there are no
//! concurrent writers. Cancellation stops workers that have not started yet;
//! anything already written to an entry is kept.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::imputation::{ImputationEngine, ImputationSummary};
use crate::application::page_scraper::GamePageScraper;
use crate::application::title_resolver::TitleResolver;
use crate::domain::{
    CatalogEntry, CatalogStore, EntryErrorHandler, HttpFetcher, ImputationError, NOT_FOUND_ID,
    PipelineError, ScrapeError, ScrapeResult, SuggestionRecord,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::retry_manager::RetryExecutor;

/// Which entries a run should scrape besides the unresolved ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshRequest {
    pub force_ids: HashSet<u64>,
    pub rescrape_all: bool,
}

impl RefreshRequest {
    /// Only unresolved entries
    pub fn unresolved_only() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            force_ids: HashSet::new(),
            rescrape_all: true,
        }
    }

    pub fn force(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            force_ids: ids.into_iter().collect(),
            rescrape_all: false,
        }
    }

    pub fn needs_scrape(&self, entry: &CatalogEntry) -> bool {
        self.rescrape_all || !entry.is_resolved() || self.force_ids.contains(&entry.id)
    }
}

/// Result of one refresh run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Every entry of the run, in input order
    pub entries: Vec<CatalogEntry>,
    pub scraped: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Entries never started because the run was cancelled
    pub skipped: usize,
    pub suggestions: Vec<SuggestionRecord>,
    pub cancelled: bool,
    pub imputation: ImputationSummary,
}

/// One per-entry failure captured during a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub entry_id: u64,
    pub entry_name: String,
    pub error: ScrapeError,
}

/// Thread-safe append-only [`EntryErrorHandler`]
#[derive(Debug, Default)]
pub struct ErrorCollector {
    failures: Mutex<Vec<EntryFailure>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<EntryFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntryErrorHandler for ErrorCollector {
    fn handle(&self, entry: &CatalogEntry, error: &ScrapeError) {
        warn!("❌ Entry {} ('{}') failed: {}", entry.id, entry.name, error);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EntryFailure {
                entry_id: entry.id,
                entry_name: entry.name.clone(),
                error: error.clone(),
            });
    }
}

#[derive(Debug)]
enum EntryOutcome {
    Scraped(Option<SuggestionRecord>),
    NotFound,
    Failed,
    Skipped,
}

pub struct Orchestrator {
    resolver: Arc<TitleResolver>,
    scraper: Arc<GamePageScraper>,
    error_handler: Arc<dyn EntryErrorHandler>,
    worker_count: usize,
}

impl Orchestrator {
    pub fn new(
        resolver: TitleResolver,
        scraper: GamePageScraper,
        error_handler: Arc<dyn EntryErrorHandler>,
        worker_count: usize,
    ) -> Self {
        Self {
            resolver: Arc::new(resolver),
            scraper: Arc::new(scraper),
            error_handler,
            worker_count: worker_count.max(1),
        }
    }

    /// Wire resolver and scraper from resolved configuration
    pub fn from_config(
        fetcher: Arc<dyn HttpFetcher>,
        config: &AppConfig,
        error_handler: Arc<dyn EntryErrorHandler>,
    ) -> Result<Self> {
        let parsing = config.scraping.to_parsing_config();
        let retry = RetryExecutor::new(config.retry.to_policy());

        Ok(Self::new(
            TitleResolver::new(Arc::clone(&fetcher), retry.clone(), &parsing)?,
            GamePageScraper::new(fetcher, retry, &parsing)?,
            error_handler,
            config.orchestrator.worker_count(),
        ))
    }

    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Scrape what `request` selects, then recompute and impute over all `entries`
    pub async fn run(
        &self,
        entries: Vec<CatalogEntry>,
        request: &RefreshRequest,
        cancellation_token: &CancellationToken,
    ) -> Result<RefreshReport, ImputationError> {
        let total = entries.len();
        let mut slots: Vec<Option<CatalogEntry>> = Vec::with_capacity(total);
        let mut work = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            if request.needs_scrape(&entry) {
                work.push((index, entry));
                slots.push(None);
            } else {
                slots.push(Some(entry));
            }
        }

        info!(
            "🚀 Refreshing {} of {} entries with {} workers",
            work.len(),
            total,
            self.worker_count
        );

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut report = RefreshReport::default();
        let mut tasks = Vec::with_capacity(work.len());
        let mut originals = Vec::with_capacity(work.len());

        for (index, entry) in work {
            if cancellation_token.is_cancelled() {
                slots[index] = Some(entry);
                report.skipped += 1;
                continue;
            }

            originals.push((index, entry.clone()));
            let resolver = Arc::clone(&self.resolver);
            let scraper = Arc::clone(&self.scraper);
            let error_handler = Arc::clone(&self.error_handler);
            let semaphore = Arc::clone(&semaphore);
            let token = cancellation_token.clone();

            tasks.push(tokio::spawn(async move {
                let mut entry = entry;
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (index, entry, EntryOutcome::Skipped),
                    },
                    () = token.cancelled() => return (index, entry, EntryOutcome::Skipped),
                };
                if token.is_cancelled() {
                    return (index, entry, EntryOutcome::Skipped);
                }

                let outcome = match process_entry(&resolver, &scraper, &mut entry, &token).await {
                    Ok(outcome) => outcome,
                    Err(ScrapeError::Cancelled) => {
                        debug!("🛑 Entry {} cancelled mid-flight", entry.id);
                        EntryOutcome::Skipped
                    }
                    Err(e) => {
                        error_handler.handle(&entry, &e);
                        EntryOutcome::Failed
                    }
                };
                (index, entry, outcome)
            }));
        }

        let results = futures::future::join_all(tasks).await;
        for (result, (index, original)) in results.into_iter().zip(originals) {
            match result {
                Ok((slot, entry, outcome)) => {
                    match outcome {
                        EntryOutcome::Scraped(suggestion) => {
                            report.scraped += 1;
                            report.suggestions.extend(suggestion);
                        }
                        EntryOutcome::NotFound => report.not_found += 1,
                        EntryOutcome::Failed => report.failed += 1,
                        EntryOutcome::Skipped => report.skipped += 1,
                    }
                    slots[slot] = Some(entry);
                }
                Err(e) => {
                    error!("❌ Worker for entry {} panicked: {}", original.id, e);
                    self.error_handler
                        .handle(&original, &ScrapeError::transient(format!("worker failed: {e}")));
                    report.failed += 1;
                    slots[index] = Some(original);
                }
            }
        }

        let mut entries: Vec<CatalogEntry> = slots.into_iter().flatten().collect();
        report.cancelled = cancellation_token.is_cancelled();
        info!(
            "✅ Fan-out finished: {} scraped, {} not found, {} failed, {} skipped",
            report.scraped, report.not_found, report.failed, report.skipped
        );

        report.imputation = ImputationEngine::run(&mut entries)?;
        report.entries = entries;
        Ok(report)
    }

    /// Load the catalog, run, and persist when imputation succeeded
    pub async fn refresh_catalog(
        &self,
        store: &dyn CatalogStore,
        request: &RefreshRequest,
        cancellation_token: &CancellationToken,
    ) -> Result<RefreshReport, PipelineError> {
        let entries = store.get_measured_entries().await?;
        let report = match self.run(entries, request, cancellation_token).await {
            Ok(report) => report,
            Err(e) => {
                error!("❌ Imputation failed, nothing persisted: {}", e);
                return Err(e.into());
            }
        };

        for suggestion in &report.suggestions {
            store.insert_suggestion(suggestion.clone()).await?;
        }
        store.replace_entries(report.entries.clone()).await?;
        info!("💾 Persisted {} catalog entries", report.entries.len());
        Ok(report)
    }
}

/// Resolve if needed, then scrape
async fn process_entry(
    resolver: &TitleResolver,
    scraper: &GamePageScraper,
    entry: &mut CatalogEntry,
    cancellation_token: &CancellationToken,
) -> ScrapeResult<EntryOutcome> {
    if !entry.is_resolved() {
        let external_id = resolver.resolve(&entry.name, cancellation_token).await?;
        if external_id == NOT_FOUND_ID {
            return Ok(EntryOutcome::NotFound);
        }
        entry.external_id = external_id;
    }

    let suggestion = scraper.scrape(entry, cancellation_token).await?;
    Ok(EntryOutcome::Scraped(suggestion))
}
