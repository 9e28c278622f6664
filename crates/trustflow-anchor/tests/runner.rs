//! Whole-component integration tests for `AnchorRunner` against a real
//! `redb` file on disk (SPEC_FULL.md §1.4).

use std::sync::Arc;

use tokio::sync::watch;

use trustflow_anchor::{AnchorConfig, AnchorRunner, DevContentSink, DevLedgerSink};
use trustflow_storage::RedbBucketStore;
use trustflow_types::{BucketKey, BucketStatus, RootHash, Scope};

fn open_store() -> (tempfile::TempDir, RedbBucketStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbBucketStore::open(dir.path().join("anchor.redb")).unwrap();
    (dir, store)
}

fn seed_bucket(store: &RedbBucketStore, scope: &Scope, key: &BucketKey) {
    store
        .with_write_txn(|txn| txn.upsert_bucket_batch(scope, key, RootHash::from([7u8; 32]), 3))
        .unwrap();
}

/// Runs the runner's `run` loop for exactly one tick: shutdown is signalled
/// right after spawning, but `run`'s immediate first tick always completes
/// before the loop observes it.
async fn run_one_tick(runner: AnchorRunner) {
    let (tx, rx) = watch::channel(false);
    let runner = Arc::new(runner);
    let handle = tokio::spawn(async move { runner.run(rx).await });
    tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn stale_open_buckets_are_auto_closed_then_anchored_on_the_next_tick() {
    let (_dir, store) = open_store();
    let scope = Scope::issue("github", 1).unwrap();
    let stale_key = BucketKey::parse("2000-01-01").unwrap();
    seed_bucket(&store, &scope, &stale_key);

    let runner = AnchorRunner::new(
        AnchorConfig::default(),
        Arc::new(store.clone()),
        Arc::new(DevContentSink),
        Arc::new(DevLedgerSink::default()),
    );

    run_one_tick(runner).await;
    let bucket = store.get_bucket(&scope, &stale_key).unwrap().unwrap();
    assert_eq!(bucket.status, BucketStatus::Anchored);
    assert!(bucket.cid.is_some());
    assert!(bucket.anchored_tx.is_some());
}

#[tokio::test]
async fn anchoring_an_open_bucket_is_rejected() {
    let (_dir, store) = open_store();
    let scope = Scope::issue("github", 2).unwrap();
    let today_key = BucketKey::today();
    seed_bucket(&store, &scope, &today_key);

    let runner = AnchorRunner::new(
        AnchorConfig::default(),
        Arc::new(store.clone()),
        Arc::new(DevContentSink),
        Arc::new(DevLedgerSink::default()),
    );

    run_one_tick(runner).await;
    let bucket = store.get_bucket(&scope, &today_key).unwrap().unwrap();
    assert_eq!(bucket.status, BucketStatus::Open);
}
