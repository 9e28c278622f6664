//! `TimelineService` — the C4 RPC surface: `GetCheckpoint`/`AppendBatch`
//! (spec.md §4.4) plus the read/admin RPCs supplemented from
//! SPEC_FULL.md §2.1, grounded on `issue_timeline.go` and `bucket.go`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use trustflow_canon::{canonicalize_and_hash, MerkleTree};
use trustflow_storage::{NewItem, RedbBucketStore};
use trustflow_types::{
    BucketKey, BucketStatus, BucketView, Checkpoint, Event, LeafHash, PageToken, Scope,
};

use crate::error::TimelineError;

/// `AppendBatch`'s request shape (spec.md §4.4). `items` need not be
/// pre-sorted; they are grouped by the bucket their own `created_at`
/// derives.
#[derive(Debug, Clone)]
pub struct AppendBatchRequest {
    pub scope: Scope,
    pub items: Vec<Event>,
    pub end_cursor: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendBatchResponse {
    pub inserted: u32,
    pub latest_cursor: String,
}

#[derive(Debug, Clone)]
pub struct CheckpointView {
    pub cursor: String,
    pub last_event_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct TimelineService {
    store: RedbBucketStore,
}

impl TimelineService {
    pub fn new(store: RedbBucketStore) -> Self {
        Self { store }
    }

    /// Returns an empty cursor, not an error, when no checkpoint has ever
    /// been written for `scope` (spec.md §4.4: "absent checkpoint means
    /// ingest from the beginning").
    pub fn get_checkpoint(&self, scope: &Scope) -> Result<CheckpointView, TimelineError> {
        match self.store.get_checkpoint(scope)? {
            Some(Checkpoint {
                cursor,
                last_event_at,
                updated_at,
            }) => Ok(CheckpointView {
                cursor,
                last_event_at,
                updated_at: Some(updated_at),
            }),
            None => Ok(CheckpointView {
                cursor: String::new(),
                last_event_at: None,
                updated_at: None,
            }),
        }
    }

    /// Implements spec.md §4.4's five steps inside one storage
    /// transaction: canonicalize and insert every item (idempotently),
    /// recompute the Merkle root of every bucket a new item landed in,
    /// auto-close any touched bucket whose key is no longer today, and
    /// upsert the checkpoint — even when every item in the batch turned
    /// out to be a duplicate, so a retried batch still advances the
    /// cursor (mirrors `issue_timeline.go`'s `AppendBatch`).
    pub fn append_batch(
        &self,
        req: AppendBatchRequest,
    ) -> Result<AppendBatchResponse, TimelineError> {
        if req.scope.entity_kind.trim().is_empty() || req.scope.entity_key.trim().is_empty() {
            return Err(TimelineError::InvalidInput(
                "scope is required".to_string(),
            ));
        }
        for item in &req.items {
            item.validate()?;
        }

        let today = BucketKey::today();
        let scope = req.scope.clone();
        // spec.md §4.4 step 4: last_event_at = max(items.created_at) over
        // the whole request, not just newly-inserted items, so a replayed
        // batch that dedups to zero inserts still recomputes the same value
        // instead of clearing it (matches `issue_timeline.go`'s `lastAt`).
        let latest_event_at = req.items.iter().map(|item| item.created_at).max();

        let inserted = self.store.with_write_txn(|txn| {
            let mut new_leaves: HashMap<BucketKey, Vec<LeafHash>> = HashMap::new();
            let mut inserted = 0u32;

            for item in &req.items {
                let bucket_key = item.bucket_key();
                let (payload_bytes, item_hash) = canonicalize_and_hash(item);

                let new = NewItem {
                    scope: scope.clone(),
                    bucket_key: bucket_key.clone(),
                    provider: item.provider.clone(),
                    provider_event_id: item.provider_event_id.clone(),
                    issue_node_id: item.issue_node_id.clone(),
                    event_type: item.event_type.clone(),
                    actor: item.actor.clone(),
                    created_at: item.created_at,
                    payload_bytes,
                    item_hash,
                };

                if txn.insert_item(&new)?.is_some() {
                    inserted += 1;
                    new_leaves.entry(bucket_key).or_default().push(item_hash.into());
                }
            }

            for (bucket_key, fresh) in new_leaves {
                let prev = txn.select_leaves(&scope, &bucket_key)?;
                let mut all_leaves: Vec<LeafHash> =
                    prev.iter().map(|(_, hash)| *hash).collect();
                let base_index = all_leaves.len() as u64;
                all_leaves.extend(fresh.iter().copied());

                let tree = MerkleTree::build(&all_leaves).ok_or(TimelineError::NoLeavesInBucket)?;
                let new_root = tree.root();

                for (offset, leaf) in fresh.iter().enumerate() {
                    txn.insert_leaf(&scope, &bucket_key, base_index + offset as u64, *leaf)?;
                }
                txn.upsert_bucket_batch(&scope, &bucket_key, new_root, fresh.len() as u64)?;

                if bucket_key < today {
                    txn.mark_closed(&scope, &bucket_key)?;
                }
            }

            txn.upsert_checkpoint(&scope, req.end_cursor.clone(), latest_event_at)?;
            Ok(inserted)
        })?;

        info!(
            scope = %scope,
            inserted,
            cursor = %req.end_cursor,
            "appended batch to timeline"
        );

        Ok(AppendBatchResponse {
            inserted,
            latest_cursor: req.end_cursor,
        })
    }

    pub fn list_buckets(&self, scope: &Scope) -> Result<Vec<BucketView>, TimelineError> {
        Ok(self.store.list_buckets_by_scope(scope)?)
    }

    pub fn get_bucket(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
    ) -> Result<BucketView, TimelineError> {
        self.store
            .get_bucket(scope, bucket_key)?
            .ok_or(TimelineError::NotFound)
    }

    pub fn list_buckets_by_status(
        &self,
        status: BucketStatus,
        limit: usize,
        page_token: Option<&PageToken>,
    ) -> Result<(Vec<BucketView>, Option<PageToken>), TimelineError> {
        Ok(self.store.list_buckets_by_status(status, limit, page_token)?)
    }

    /// Builds an inclusion proof for `provider_event_id`, grounded on
    /// `bucket.go`'s `InclusionProof`: locate the item, confirm it
    /// actually belongs to the caller's `(scope, bucket_key)`, then find
    /// its leaf by matching `item_hash` against the bucket's ordered
    /// leaves (there is no stored `leaf_index` on the item row — the
    /// leaf's position is derived, not cached).
    pub fn inclusion_proof(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        provider_event_id: &str,
    ) -> Result<trustflow_canon::InclusionProof, TimelineError> {
        let lookup = self
            .store
            .get_item_for_proof(provider_event_id)?
            .ok_or(TimelineError::NotFound)?;

        if &lookup.scope != scope || &lookup.bucket_key != bucket_key {
            warn!(
                provider_event_id,
                requested_bucket = %bucket_key,
                actual_bucket = %lookup.bucket_key,
                "inclusion proof requested against the wrong bucket"
            );
            return Err(TimelineError::ItemNotInRequestedBucket);
        }

        let leaves = self.store.select_leaves(scope, bucket_key)?;
        if leaves.is_empty() {
            return Err(TimelineError::NoLeavesInBucket);
        }

        let ordered: Vec<LeafHash> = leaves.iter().map(|(_, hash)| *hash).collect();
        let target: LeafHash = lookup.item_hash.into();
        let index = ordered
            .iter()
            .position(|h| h.as_bytes() == target.as_bytes())
            .ok_or(TimelineError::LeafNotFoundInBucket)?;

        let tree = MerkleTree::build(&ordered).ok_or(TimelineError::NoLeavesInBucket)?;
        tree.proof(&ordered, index)
            .ok_or(TimelineError::LeafNotFoundInBucket)
    }
}

