//! Whole-component integration tests for `TimelineService` against a real
//! `redb` file on disk (SPEC_FULL.md §1.4).

use chrono::{DateTime, Utc};
use serde_json::json;

use trustflow_canon::{canonicalize_and_hash, verify};
use trustflow_storage::RedbBucketStore;
use trustflow_timeline::{AppendBatchRequest, TimelineError, TimelineService};
use trustflow_types::{BucketKey, BucketStatus, Event, LeafHash, Scope};

fn store() -> (RedbBucketStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbBucketStore::open(dir.path().join("trustflow.redb")).unwrap();
    (store, dir)
}

fn scope() -> Scope {
    Scope::issue("github", 7).unwrap()
}

fn event(id: &str, created_at: &str) -> Event {
    Event {
        provider: "github".to_string(),
        provider_event_id: id.to_string(),
        issue_node_id: Some("I_1".to_string()),
        event_type: "IssueComment".to_string(),
        actor: Some("alice".to_string()),
        created_at: DateTime::parse_from_rfc3339(created_at)
            .unwrap()
            .with_timezone(&Utc),
        payload: json!({"body": id}).as_object().cloned().unwrap(),
    }
}

#[test]
fn append_batch_is_idempotent_on_provider_event_id() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();
    let items = vec![event("A", "2025-01-10T01:00:00Z"), event("B", "2025-01-10T02:00:00Z")];

    let first = svc
        .append_batch(AppendBatchRequest {
            scope: s.clone(),
            items: items.clone(),
            end_cursor: "c1".to_string(),
        })
        .unwrap();
    assert_eq!(first.inserted, 2);

    let second = svc
        .append_batch(AppendBatchRequest {
            scope: s.clone(),
            items,
            end_cursor: "c1".to_string(),
        })
        .unwrap();
    assert_eq!(second.inserted, 0, "replaying the same batch must insert nothing new");

    let bucket = svc
        .get_bucket(&s, &BucketKey::parse("2025-01-10").unwrap())
        .unwrap();
    assert_eq!(bucket.leaf_count, 2);
}

#[test]
fn bucket_root_matches_an_independent_merkle_computation() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();
    let items = vec![
        event("A", "2025-01-10T01:00:00Z"),
        event("B", "2025-01-10T02:00:00Z"),
        event("C", "2025-01-10T03:00:00Z"),
    ];

    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: items.clone(),
        end_cursor: "c1".to_string(),
    })
    .unwrap();

    let bk = BucketKey::parse("2025-01-10").unwrap();
    let bucket = svc.get_bucket(&s, &bk).unwrap();

    let expected_leaves: Vec<LeafHash> = items
        .iter()
        .map(|e| canonicalize_and_hash(e).1.into())
        .collect();
    let expected_root = trustflow_canon::root_of(&expected_leaves).unwrap();

    assert_eq!(bucket.root_hash.unwrap().as_bytes(), expected_root.as_bytes());
}

#[test]
fn inclusion_proof_round_trips_and_detects_tampering() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();
    let items = vec![
        event("A", "2025-01-10T01:00:00Z"),
        event("B", "2025-01-10T02:00:00Z"),
        event("C", "2025-01-10T03:00:00Z"),
    ];
    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items,
        end_cursor: "c1".to_string(),
    })
    .unwrap();

    let bk = BucketKey::parse("2025-01-10").unwrap();
    let proof = svc.inclusion_proof(&s, &bk, "B").unwrap();
    assert!(verify(&proof));

    let mut tampered = proof.clone();
    tampered.leaf = LeafHash([0xAB; 32]);
    assert!(!verify(&tampered));
}

#[test]
fn inclusion_proof_rejects_a_mismatched_bucket_ref() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();
    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: vec![event("A", "2025-01-10T01:00:00Z")],
        end_cursor: "c1".to_string(),
    })
    .unwrap();

    let wrong_bucket = BucketKey::parse("2025-01-11").unwrap();
    let result = svc.inclusion_proof(&s, &wrong_bucket, "A");
    assert!(matches!(result, Err(TimelineError::ItemNotInRequestedBucket)));
}

#[test]
fn checkpoint_persists_across_batches_even_with_zero_new_items() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();

    assert_eq!(svc.get_checkpoint(&s).unwrap().cursor, "");

    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: vec![event("A", "2025-01-10T01:00:00Z")],
        end_cursor: "c1".to_string(),
    })
    .unwrap();
    assert_eq!(svc.get_checkpoint(&s).unwrap().cursor, "c1");

    // Replaying with zero new items still advances the cursor.
    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: vec![event("A", "2025-01-10T01:00:00Z")],
        end_cursor: "c2".to_string(),
    })
    .unwrap();
    assert_eq!(svc.get_checkpoint(&s).unwrap().cursor, "c2");
}

#[test]
fn a_late_item_into_an_already_closed_bucket_aborts_the_whole_batch() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();
    let bk = BucketKey::parse("2025-01-10").unwrap();

    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: vec![event("A", "2025-01-10T01:00:00Z")],
        end_cursor: "c1".to_string(),
    })
    .unwrap();
    let before = svc.get_bucket(&s, &bk).unwrap();
    assert_eq!(before.status, BucketStatus::Closed);

    let result = svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: vec![event("E", "2025-01-10T05:00:00Z")],
        end_cursor: "c2".to_string(),
    });
    assert!(matches!(result, Err(TimelineError::Storage(_))));

    // Neither the bucket nor the checkpoint advanced.
    let after = svc.get_bucket(&s, &bk).unwrap();
    assert_eq!(after.leaf_count, before.leaf_count);
    assert_eq!(after.root_hash.unwrap().as_bytes(), before.root_hash.unwrap().as_bytes());
    assert_eq!(svc.get_checkpoint(&s).unwrap().cursor, "c1");
}

#[test]
fn buckets_older_than_today_are_auto_closed_on_append() {
    let (store, _dir) = store();
    let svc = TimelineService::new(store);
    let s = scope();
    svc.append_batch(AppendBatchRequest {
        scope: s.clone(),
        items: vec![event("A", "2025-01-10T01:00:00Z")],
        end_cursor: "c1".to_string(),
    })
    .unwrap();

    let bk = BucketKey::parse("2025-01-10").unwrap();
    let bucket = svc.get_bucket(&s, &bk).unwrap();
    assert_eq!(bucket.status, BucketStatus::Closed);
}
