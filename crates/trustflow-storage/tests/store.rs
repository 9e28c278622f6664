//! Whole-store integration tests exercising `RedbBucketStore` against a
//! real `redb` file on disk (SPEC_FULL.md §1.4).

use chrono::Utc;
use trustflow_storage::{NewItem, RedbBucketStore, StorageError};
use trustflow_types::{BucketKey, BucketStatus, ItemHash, LeafHash, RootHash, Scope};

fn open_store() -> (RedbBucketStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbBucketStore::open(dir.path().join("trustflow.redb")).unwrap();
    (store, dir)
}

fn scope() -> Scope {
    Scope::new("issue", "github#7").unwrap()
}

fn new_item(id: &str, bucket_key: &str) -> NewItem {
    NewItem {
        scope: scope(),
        bucket_key: BucketKey::parse(bucket_key).unwrap(),
        provider: "github".to_string(),
        provider_event_id: id.to_string(),
        issue_node_id: None,
        event_type: "IssueComment".to_string(),
        actor: None,
        created_at: Utc::now(),
        payload_bytes: vec![1, 2, 3],
        item_hash: ItemHash([id.as_bytes()[0]; 32]),
    }
}

#[test]
fn insert_item_is_idempotent_on_provider_event_id() {
    let (store, _dir) = open_store();
    store
        .with_write_txn(|txn| {
            let first = txn.insert_item(&new_item("A", "2025-01-10"))?;
            let second = txn.insert_item(&new_item("A", "2025-01-10"))?;
            assert_eq!(first, Some(1));
            assert_eq!(second, None);
            Ok(())
        })
        .unwrap();
}

#[test]
fn append_batch_updates_leaves_and_bucket_root_transactionally() {
    let (store, _dir) = open_store();
    let s = scope();
    let bk = BucketKey::parse("2025-01-10").unwrap();

    store
        .with_write_txn(|txn| {
            txn.insert_item(&new_item("A", "2025-01-10"))?;
            txn.insert_item(&new_item("B", "2025-01-10"))?;
            txn.insert_leaf(&s, &bk, 0, LeafHash([b'A'; 32]))?;
            txn.insert_leaf(&s, &bk, 1, LeafHash([b'B'; 32]))?;
            txn.upsert_bucket_batch(&s, &bk, RootHash([9u8; 32]), 2)?;
            txn.upsert_checkpoint(&s, "c1".to_string(), None)?;
            Ok(())
        })
        .unwrap();

    let leaves = store.select_leaves(&s, &bk).unwrap();
    assert_eq!(leaves, vec![(0, LeafHash([b'A'; 32])), (1, LeafHash([b'B'; 32]))]);

    let bucket = store.get_bucket(&s, &bk).unwrap().unwrap();
    assert_eq!(bucket.leaf_count, 2);
    assert_eq!(bucket.status, BucketStatus::Open);

    let checkpoint = store.get_checkpoint(&s).unwrap().unwrap();
    assert_eq!(checkpoint.cursor, "c1");
}

#[test]
fn insert_leaf_rejects_duplicate_index() {
    let (store, _dir) = open_store();
    let s = scope();
    let bk = BucketKey::parse("2025-01-10").unwrap();
    let result = store.with_write_txn(|txn| {
        txn.insert_leaf(&s, &bk, 0, LeafHash([1u8; 32]))?;
        txn.insert_leaf(&s, &bk, 0, LeafHash([2u8; 32]))?;
        Ok(())
    });
    assert!(matches!(result, Err(StorageError::LeafAlreadyExists { .. })));
}

#[test]
fn status_transitions_follow_the_monotonic_lifecycle() {
    let (store, _dir) = open_store();
    let s = scope();
    let bk = BucketKey::parse("2025-01-10").unwrap();

    store
        .with_write_txn(|txn| txn.upsert_bucket_batch(&s, &bk, RootHash([1u8; 32]), 1))
        .unwrap();

    // Anchoring an open bucket is rejected.
    assert!(!store
        .set_anchored(&s, &bk, "devcid-x".to_string(), "tx-1".to_string())
        .unwrap());

    assert!(store.mark_closed(&s, &bk).unwrap());
    // Closing twice is a no-op, not an error.
    assert!(!store.mark_closed(&s, &bk).unwrap());

    assert!(store
        .set_anchored(&s, &bk, "devcid-x".to_string(), "tx-1".to_string())
        .unwrap());
    let bucket = store.get_bucket(&s, &bk).unwrap().unwrap();
    assert_eq!(bucket.status, BucketStatus::Anchored);
    assert_eq!(bucket.cid.as_deref(), Some("devcid-x"));
}

#[test]
fn list_buckets_by_status_pages_through_results() {
    let (store, _dir) = open_store();
    let s = scope();
    for day in 1..=5 {
        let bk = BucketKey::parse(format!("2025-01-{day:02}")).unwrap();
        store
            .with_write_txn(|txn| txn.upsert_bucket_batch(&s, &bk, RootHash([day; 32]), 1))
            .unwrap();
    }

    let (page1, token1) = store
        .list_buckets_by_status(BucketStatus::Open, 2, None)
        .unwrap();
    assert_eq!(page1.len(), 2);
    let token1 = token1.expect("more pages remain");

    let (page2, token2) = store
        .list_buckets_by_status(BucketStatus::Open, 2, Some(&token1))
        .unwrap();
    assert_eq!(page2.len(), 2);
    assert_ne!(page1[0].bucket_key, page2[0].bucket_key);
    let token2 = token2.expect("one more page remains");

    let (page3, token3) = store
        .list_buckets_by_status(BucketStatus::Open, 2, Some(&token2))
        .unwrap();
    assert_eq!(page3.len(), 1);
    assert!(token3.is_none());
}

#[test]
fn upsert_bucket_batch_rejects_mutation_once_the_bucket_is_closed() {
    let (store, _dir) = open_store();
    let s = scope();
    let bk = BucketKey::parse("2025-01-10").unwrap();

    store
        .with_write_txn(|txn| txn.upsert_bucket_batch(&s, &bk, RootHash([1u8; 32]), 1))
        .unwrap();
    assert!(store.mark_closed(&s, &bk).unwrap());

    let result =
        store.with_write_txn(|txn| txn.upsert_bucket_batch(&s, &bk, RootHash([2u8; 32]), 1));
    assert!(matches!(result, Err(StorageError::BucketNotOpen { .. })));

    // The frozen fields are untouched.
    let bucket = store.get_bucket(&s, &bk).unwrap().unwrap();
    assert_eq!(bucket.leaf_count, 1);
    assert_eq!(bucket.root_hash, Some(RootHash([1u8; 32])));
}

#[test]
fn get_item_for_proof_round_trips_through_select_leaves() {
    let (store, _dir) = open_store();
    let s = scope();
    let bk = BucketKey::parse("2025-01-10").unwrap();
    let item = new_item("A", "2025-01-10");
    let item_hash = item.item_hash;

    store
        .with_write_txn(|txn| {
            txn.insert_item(&item)?;
            txn.insert_leaf(&s, &bk, 0, LeafHash::from(item_hash))?;
            txn.upsert_bucket_batch(&s, &bk, RootHash(item_hash.0), 1)
        })
        .unwrap();

    let lookup = store.get_item_for_proof("A").unwrap().unwrap();
    assert_eq!(lookup.scope, s);
    assert_eq!(lookup.bucket_key, bk);
    assert_eq!(lookup.item_hash.as_bytes(), item_hash.as_bytes());

    let leaves = store.select_leaves(&s, &bk).unwrap();
    assert!(leaves.iter().any(|(_, h)| h.as_bytes() == &item_hash.0));
}
