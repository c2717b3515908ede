//! End-to-end cycles over the real parser and the on-disk seen-set store

mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_watch_lib::application::{CatalogScanner, LoopSettings, PollLoop, ScanPolicy};
use catalog_watch_lib::domain::SeenStore;
use catalog_watch_lib::infrastructure::{JsonFileSeenStore, ProductListParser};
use common::{listing, Outbox, StaticCatalog};
use tempfile::tempdir;

fn settings() -> LoopSettings {
    LoopSettings {
        interval: Duration::from_millis(10),
        notify_delay: Duration::ZERO,
        persist_attempts: 3,
    }
}

fn poll_loop(
    catalog: Arc<StaticCatalog>,
    store: JsonFileSeenStore,
    outbox: Arc<Outbox>,
) -> PollLoop<JsonFileSeenStore> {
    let scanner = CatalogScanner::new(
        catalog,
        ProductListParser::new().unwrap(),
        ScanPolicy {
            max_pages: 20,
            max_attempts: 3,
            retry_delay: Duration::from_millis(1),
        },
    );
    PollLoop::new(scanner, store, outbox, settings())
}

#[tokio::test]
async fn notifies_new_products_and_remembers_them() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("seen_products.json");
    std::fs::write(&state, r#"["1"]"#).unwrap();

    let catalog = Arc::new(StaticCatalog::new(vec![listing(&[
        ("1", "Lampa", "49 lei"),
        ("2", "Masa", "120 lei"),
        ("3", "Scaun", "80 lei"),
    ])]));
    let outbox = Arc::new(Outbox::default());
    let store = JsonFileSeenStore::load(&state).unwrap();

    let mut poll = poll_loop(catalog, store, outbox.clone());
    let report = poll.run_cycle().await.unwrap();

    assert_eq!(outbox.sent(), vec!["2", "3"]);
    assert!(report.persisted);

    let reloaded = JsonFileSeenStore::load(&state).unwrap();
    assert_eq!(reloaded.len(), 3);
    for id in ["1", "2", "3"] {
        assert!(!reloaded.is_new(id));
    }
    assert_eq!(
        reloaded.seen_set().get("3").and_then(|e| e.name.as_deref()),
        Some("Scaun")
    );
}

#[tokio::test]
async fn repeated_cycles_and_restarts_never_renotify() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("seen_products.json");
    let pages = vec![
        listing(&[("10", "A", "1 lei"), ("11", "B", "2 lei")]),
        listing(&[("12", "C", "3 lei")]),
    ];

    let outbox = Arc::new(Outbox::default());
    {
        let catalog = Arc::new(StaticCatalog::new(pages.clone()));
        let mut poll = poll_loop(catalog, JsonFileSeenStore::load(&state).unwrap(), outbox.clone());
        poll.run_cycle().await.unwrap();
        poll.run_cycle().await.unwrap();
    }

    // Fresh process over the same state file
    let catalog = Arc::new(StaticCatalog::new(pages));
    let mut poll = poll_loop(catalog.clone(), JsonFileSeenStore::load(&state).unwrap(), outbox.clone());
    let report = poll.run_cycle().await.unwrap();

    assert_eq!(outbox.sent(), vec!["10", "11", "12"]);
    assert_eq!(report.new_products, 0);
    assert_eq!(catalog.fetched(), vec![1, 2, 3]);
}

#[tokio::test]
async fn products_listed_later_are_picked_up() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("seen_products.json");
    let catalog = Arc::new(StaticCatalog::new(vec![listing(&[("1", "A", "1 lei")])]));
    let outbox = Arc::new(Outbox::default());
    let mut poll = poll_loop(catalog.clone(), JsonFileSeenStore::load(&state).unwrap(), outbox.clone());

    poll.run_cycle().await.unwrap();
    catalog.replace_page(1, listing(&[("2", "B", "2 lei"), ("1", "A", "1 lei")]));
    poll.run_cycle().await.unwrap();

    assert_eq!(outbox.sent(), vec!["1", "2"]);
}

#[tokio::test]
async fn undelivered_products_stay_new_across_restart() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("seen_products.json");
    let catalog = Arc::new(StaticCatalog::new(vec![listing(&[("1", "A", "1 lei"), ("2", "B", "2 lei")])]));
    let outbox = Arc::new(Outbox::default());
    outbox.set_offline(true);

    let mut poll = poll_loop(catalog.clone(), JsonFileSeenStore::load(&state).unwrap(), outbox.clone());
    let report = poll.run_cycle().await.unwrap();
    assert_eq!(report.failed.len(), 2);
    assert!(!report.persisted);
    assert!(!state.exists());
    drop(poll);

    outbox.set_offline(false);
    let mut poll = poll_loop(catalog, JsonFileSeenStore::load(&state).unwrap(), outbox.clone());
    poll.run_cycle().await.unwrap();

    assert_eq!(outbox.sent(), vec!["1", "2"]);
    assert_eq!(JsonFileSeenStore::load(&state).unwrap().len(), 2);
}

#[tokio::test]
async fn continuous_mode_persists_before_returning() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("nested").join("seen_products.json");
    let catalog = Arc::new(StaticCatalog::new(vec![listing(&[("7", "G", "7 lei")])]));
    let outbox = Arc::new(Outbox::default());
    let mut poll = poll_loop(catalog, JsonFileSeenStore::load(&state).unwrap(), outbox.clone());

    let checks = poll.run_forever(tokio::time::sleep(Duration::from_millis(60))).await;

    assert!(checks >= 1);
    assert_eq!(outbox.sent(), vec!["7"]);
    assert!(!JsonFileSeenStore::load(&state).unwrap().is_new("7"));
}
