//! ttb-refresh: resolve, scrape and impute time-to-beat for a list of titles
//!
//! Usage: `ttb-refresh [--config PATH] TITLE...`
//!
//! Seeds an in-memory catalog with one entry per title, runs a full refresh
//! against the live site and prints the resulting entries as JSON. Ctrl-C
//! cancels outstanding work; whatever finished is still imputed and printed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ttb_catalog_lib::application::{ErrorCollector, Orchestrator, RefreshRequest};
use ttb_catalog_lib::domain::{CatalogEntry, CatalogStore};
use ttb_catalog_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use ttb_catalog_lib::infrastructure::{AppConfig, HttpClient, HttpClientConfig, InMemoryCatalogStore};

/// Resolve, scrape and impute time-to-beat for a list of titles
#[derive(Debug, Parser)]
#[command(name = "ttb-refresh", version, about)]
struct Args {
    /// Configuration file layered under `TTB__*` environment variables
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Titles to seed the catalog with
    #[arg(required = true, value_name = "TITLE")]
    titles: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    let fetcher = Arc::new(HttpClient::new(HttpClientConfig::from(&config.scraping))?);
    let errors = Arc::new(ErrorCollector::new());
    let orchestrator = Orchestrator::from_config(fetcher, &config, errors.clone())?;

    let store = InMemoryCatalogStore::with_entries(
        args.titles
            .iter()
            .zip(1u64..)
            .map(|(title, id)| CatalogEntry::new(id, title.as_str())),
    );

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, cancelling refresh");
            ctrl_c_token.cancel();
        }
    });

    let report = orchestrator
        .refresh_catalog(&store, &RefreshRequest::default(), &token)
        .await
        .context("Catalog refresh failed")?;

    info!(
        "🏁 Done: {} scraped, {} not found, {} failed, {} suggestions",
        report.scraped,
        report.not_found,
        report.failed,
        report.suggestions.len()
    );
    for failure in errors.failures() {
        warn!("Entry {} ('{}'): {}", failure.entry_id, failure.entry_name, failure.error);
    }

    let entries = store.get_measured_entries().await?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
