//! End-to-end scrape-and-impute runs against canned site responses

use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use tokio_util::sync::CancellationToken;
use ttb_catalog_lib::application::{ErrorCollector, GamePageScraper, Orchestrator, RefreshRequest, TitleResolver};
use ttb_catalog_lib::domain::{
    CatalogEntry, CatalogStore, Classification, DurationTier, NOT_FOUND_ID, PipelineError, ScrapeError,
    SuggestionKind,
};
use ttb_catalog_lib::infrastructure::{InMemoryCatalogStore, ParsingConfig, RetryExecutor, RetryPolicy};
use ttb_catalog_lib::test_utils::{
    StaticFetcher, detail_url, fast_retry_policy, fixtures, measured_entry, unscraped_entry,
};

fn orchestrator(fetcher: &Arc<StaticFetcher>, errors: &Arc<ErrorCollector>) -> Orchestrator {
    orchestrator_with_policy(fetcher, errors, fast_retry_policy())
}

fn orchestrator_with_policy(
    fetcher: &Arc<StaticFetcher>,
    errors: &Arc<ErrorCollector>,
    policy: RetryPolicy,
) -> Orchestrator {
    let parsing = ParsingConfig::default();
    let retry = RetryExecutor::new(policy);
    Orchestrator::new(
        TitleResolver::new(fetcher.clone(), retry.clone(), &parsing).unwrap(),
        GamePageScraper::new(fetcher.clone(), retry, &parsing).unwrap(),
        errors.clone(),
        4,
    )
}

fn site() -> StaticFetcher {
    StaticFetcher::new()
        .with_search_hit("Portal", "Portal", 7231)
        .with_game(7231, fixtures::portal_page())
        .with_search_hit("Spiral Knights", "Spiral Knights", 9536)
        .with_game(9536, fixtures::spiral_knights_page())
}

fn by_id(entries: &[CatalogEntry], id: u64) -> &CatalogEntry {
    entries.iter().find(|e| e.id == id).unwrap()
}

#[tokio::test]
async fn portal_is_fully_measured_with_2007_release() {
    let fetcher = Arc::new(site());
    let errors = Arc::new(ErrorCollector::new());

    let report = orchestrator(&fetcher, &errors)
        .run(
            vec![unscraped_entry(400, "Portal", "Puzzle")],
            &RefreshRequest::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let portal = &report.entries[0];
    assert_eq!(portal.external_id, 7231);
    for tier in [portal.main, portal.extras, portal.completionist] {
        assert!(!tier.imputed);
        assert!(tier.minutes > 0);
    }
    assert_eq!(portal.release_date.map(|d| d.year()), Some(2007));
    assert!(errors.is_empty());
}

#[tokio::test]
async fn spiral_knights_scrapes_to_zero_imputed_tiers() {
    let fetcher = Arc::new(site());
    let scraper = GamePageScraper::new(
        fetcher,
        RetryExecutor::new(fast_retry_policy()),
        &ParsingConfig::default(),
    )
    .unwrap();
    let mut entry = unscraped_entry(99900, "Spiral Knights", "Action");
    entry.external_id = 9536;

    scraper.scrape(&mut entry, &CancellationToken::new()).await.unwrap();

    assert_eq!(entry.main, DurationTier::unknown());
    assert_eq!(entry.extras, DurationTier::unknown());
    assert_eq!(entry.completionist, DurationTier::unknown());
}

#[tokio::test]
async fn random_guid_title_is_not_found() {
    let fetcher = Arc::new(site());
    let resolver = TitleResolver::new(
        fetcher,
        RetryExecutor::new(fast_retry_policy()),
        &ParsingConfig::default(),
    )
    .unwrap();

    let title = uuid::Uuid::new_v4().to_string();
    let id = resolver.resolve(&title, &CancellationToken::new()).await;
    assert_eq!(id, Ok(NOT_FOUND_ID));
}

#[tokio::test]
async fn every_entry_ends_with_ordered_positive_tiers() {
    let fetcher = Arc::new(site());
    let errors = Arc::new(ErrorCollector::new());
    let entries = vec![
        unscraped_entry(1, "Portal", "Puzzle"),
        unscraped_entry(2, "Spiral Knights", "Puzzle"),
        unscraped_entry(3, &uuid::Uuid::new_v4().to_string(), "Puzzle"),
        measured_entry(4, "Puzzle", Classification::Game, (600, 0, 0)),
        measured_entry(5, "Puzzle", Classification::Game, (0, 0, 2000)),
    ];

    let report = orchestrator(&fetcher, &errors)
        .run(entries, &RefreshRequest::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries.len(), 5);
    for entry in &report.entries {
        assert!(entry.tiers_ordered(), "unordered: {entry:?}");
    }
    let spiral = by_id(&report.entries, 2);
    assert_eq!(spiral.external_id, 9536);
    assert!(spiral.is_fully_imputed());
    assert_eq!(by_id(&report.entries, 3).external_id, NOT_FOUND_ID);
}

#[tokio::test]
async fn endless_title_yields_one_suggestion_and_untouched_tiers() {
    let fetcher = Arc::new(
        site()
            .with_search_hit("Minecraft", "Minecraft", 27)
            .with_game(27, fixtures::endless_page("Minecraft")),
    );
    let errors = Arc::new(ErrorCollector::new());
    let store = InMemoryCatalogStore::with_entries([
        measured_entry(1, "Sandbox", Classification::Game, (600, 1200, 3000)),
        unscraped_entry(2, "Minecraft", "Sandbox"),
    ]);

    let report = orchestrator(&fetcher, &errors)
        .refresh_catalog(&store, &RefreshRequest::default(), &CancellationToken::new())
        .await
        .unwrap();

    let suggestions = store.suggestions().await;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].kind, SuggestionKind::Endless);
    assert_eq!(suggestions[0].external_id, 27);
    assert_eq!(report.suggestions.len(), 1);

    let minecraft = store.get(2).await.unwrap();
    assert_eq!(minecraft.external_id, 27);
    assert!(minecraft.is_fully_imputed());
    assert_eq!(minecraft.main.minutes, 600);
}

#[tokio::test]
async fn one_format_fault_does_not_sink_the_batch() {
    let broken = fixtures::game_page("Broken", None, &[("Main Story", "ages")]);
    let fetcher = Arc::new(
        site()
            .with_search_hit("Broken", "Broken", 1)
            .with_game(1, broken)
            .with_search_hit("Portal 2", "Portal 2", 7232)
            .with_game(7232, fixtures::game_page("Portal 2", Some(&["2011"]), &[("Main Story", "8 Hours")])),
    );
    let errors = Arc::new(ErrorCollector::new());
    let entries = vec![
        unscraped_entry(10, "Portal", "Puzzle"),
        unscraped_entry(11, "Broken", "Puzzle"),
        unscraped_entry(12, "Portal 2", "Puzzle"),
        unscraped_entry(13, "Spiral Knights", "Puzzle"),
    ];

    let report = orchestrator(&fetcher, &errors)
        .run(entries, &RefreshRequest::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.scraped, 3);
    assert_eq!(report.failed, 1);

    let failures = errors.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].entry_id, 11);
    assert!(matches!(failures[0].error, ScrapeError::Format { .. }));
    // the id was resolved before the page failed to parse
    assert_eq!(by_id(&report.entries, 11).external_id, 1);
}

#[tokio::test]
async fn exhausted_transient_faults_are_reported_per_entry() {
    let fetcher = Arc::new(
        site()
            .with_search_hit("Flaky", "Flaky", 55)
            .with_responses(detail_url(55), vec![Err(ScrapeError::transient("HTTP 503"))]),
    );
    let errors = Arc::new(ErrorCollector::new());
    let entries = vec![
        unscraped_entry(1, "Portal", "Puzzle"),
        unscraped_entry(2, "Flaky", "Puzzle"),
    ];

    let report = orchestrator(&fetcher, &errors)
        .run(entries, &RefreshRequest::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(errors.failures()[0].error, ScrapeError::transient("HTTP 503"));
    // initial attempt plus three retries for the flaky page, one for Portal
    assert_eq!(fetcher.get_calls(), 5);
    assert!(by_id(&report.entries, 2).tiers_ordered());
}

#[tokio::test]
async fn punctuation_mismatch_resolves_through_normalized_search() {
    let fetcher = Arc::new(
        site()
            .with_search_hit("Portal  Still Alive", "Portal: Still Alive", 7240)
            .with_game(7240, fixtures::game_page("Portal: Still Alive", None, &[("Main Story", "4 Hours")])),
    );
    let errors = Arc::new(ErrorCollector::new());

    let report = orchestrator(&fetcher, &errors)
        .run(
            vec![
                unscraped_entry(1, "Portal", "Puzzle"),
                unscraped_entry(2, "Portal: Still Alive", "Puzzle"),
            ],
            &RefreshRequest::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let still_alive = by_id(&report.entries, 2);
    assert_eq!(still_alive.external_id, 7240);
    assert_eq!(still_alive.external_name.as_deref(), Some("Portal: Still Alive"));
    assert_eq!(still_alive.main, DurationTier::scraped(240));
}

#[tokio::test]
async fn imputation_failure_blocks_persistence() {
    let fetcher = Arc::new(site());
    let errors = Arc::new(ErrorCollector::new());
    let seeded = unscraped_entry(1, "Spiral Knights", "Action");
    let store = InMemoryCatalogStore::with_entries([seeded.clone()]);

    let result = orchestrator(&fetcher, &errors)
        .refresh_catalog(&store, &RefreshRequest::default(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(PipelineError::Imputation(_))));
    assert_eq!(store.get_measured_entries().await.unwrap(), vec![seeded]);
}

#[tokio::test]
async fn forced_rescrape_refreshes_resolved_entries() {
    let fetcher = Arc::new(site());
    let errors = Arc::new(ErrorCollector::new());
    let mut stale = unscraped_entry(1, "Portal", "Puzzle");
    stale.external_id = 7231;
    stale.set_scraped_tiers(100, 200, 300);

    let report = orchestrator(&fetcher, &errors)
        .run(vec![stale.clone()], &RefreshRequest::unresolved_only(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.scraped, 0);
    assert_eq!(report.entries[0].main.minutes, 100);

    let report = orchestrator(&fetcher, &errors)
        .run(vec![stale], &RefreshRequest::force([1]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.scraped, 1);
    assert_eq!(report.entries[0].main.minutes, 180);
    assert_eq!(fetcher.post_calls(), 0);
}

#[tokio::test]
async fn cancellation_mid_backoff_keeps_finished_work() {
    let fetcher = Arc::new(
        site()
            .with_search_hit("Flaky Game", "Flaky Game", 55)
            .with_responses(detail_url(55), vec![Err(ScrapeError::transient("HTTP 503"))]),
    );
    let errors = Arc::new(ErrorCollector::new());
    let slow_backoff = RetryPolicy {
        retry_count: 3,
        min_backoff: Duration::from_secs(5),
        max_backoff: Duration::from_secs(10),
        delta_backoff: Duration::from_secs(1),
    };

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let report = orchestrator_with_policy(&fetcher, &errors, slow_backoff)
        .run(
            vec![
                unscraped_entry(1, "Portal", "Puzzle"),
                unscraped_entry(2, "Flaky Game", "Puzzle"),
            ],
            &RefreshRequest::default(),
            &token,
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.cancelled);
    assert_eq!(report.scraped, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert!(errors.is_empty());

    let portal = by_id(&report.entries, 1);
    assert_eq!(portal.main, DurationTier::scraped(180));
    let flaky = by_id(&report.entries, 2);
    assert_eq!(flaky.external_id, 55);
    assert!(flaky.main.imputed);
}
