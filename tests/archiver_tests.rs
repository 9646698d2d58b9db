// History archiver: deltas written per cycle, baseline advanced even on failure

mod common;

use common::temp_repo;
use std::sync::Arc;
use trafficd::archiver::HistoryArchiver;
use trafficd::error::TrafficError;
use trafficd::models::NetworkMode;
use trafficd::stats_store::StatsStore;

#[tokio::test]
async fn idle_second_cycle_writes_nothing() {
    let (_dir, repo) = temp_repo().await;
    let repo = Arc::new(repo);
    let store = Arc::new(StatsStore::new());
    let mut archiver = HistoryArchiver::new(store.clone(), repo.clone());

    store.credit("Emby", NetworkMode::Host, 10, 150);
    store.credit("media1", NetworkMode::Bridge, 200, 500);
    assert_eq!(archiver.archive_once().await.unwrap(), 2);
    assert_eq!(archiver.archive_once().await.unwrap(), 0);
    assert_eq!(repo.record_count().await.unwrap(), 2);

    store.credit("Emby", NetworkMode::Host, 0, 50);
    assert_eq!(archiver.archive_once().await.unwrap(), 1);
    let records = repo.records_since(0).await.unwrap();
    let last = records.last().unwrap();
    assert_eq!(last.name, "Emby");
    assert_eq!((last.upload, last.download), (0, 50));
}

#[tokio::test]
async fn persistence_failure_still_advances_baseline() {
    let (_dir, repo) = temp_repo().await;
    let repo = Arc::new(repo);
    let store = Arc::new(StatsStore::new());
    let mut archiver = HistoryArchiver::new(store.clone(), repo.clone());

    store.credit("Emby", NetworkMode::Host, 10, 20);
    repo.close().await;

    let err = archiver.archive_once().await.unwrap_err();
    assert!(matches!(err, TrafficError::PersistenceUnavailable(_)));
    assert_eq!(archiver.baselines().get("Emby"), Some((10, 20)));

    // Nothing new since the failed cycle: no delta to write, so no store access.
    assert_eq!(archiver.archive_once().await.unwrap(), 0);
}
