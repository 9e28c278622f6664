//! C3 — Bucket Store: a `redb`-backed transactional store of items,
//! leaves, bucket rows, and checkpoints (spec.md §4.3).
//!
//! Grounded directly on `redb_epoch_store.rs`: fixed `TableDefinition`s
//! over prefix-encoded keys, `Database::create` + `begin_write`/`commit`,
//! and the "open the table fresh inside each operation" style rather
//! than threading table handles around. Unlike the teacher, there is no
//! background flush thread here — every `AppendBatch` is a single
//! synchronous `redb` transaction, which is what spec.md §4.4's "any
//! error during (1)-(4) aborts the transaction" and §8 property 1
//! (idempotence) require: partial batches must never be observable.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};

use trustflow_types::{BucketKey, BucketStatus, BucketView, Checkpoint, Item, ItemHash, LeafHash, PageToken, RootHash, Scope};

use crate::codec::be64;
use crate::error::StorageError;
use crate::keys::{
    bucket_row_key, checkpoint_key, leaf_key, leaf_prefix, scope_prefix, status_index_key,
    status_index_prefix, strip_status_byte,
};
use crate::rows::{decode_checkpoint, decode_item, encode_checkpoint, encode_item, BucketRow};

const ITEMS: TableDefinition<&str, &[u8]> = TableDefinition::new("ITEMS");
const LEAVES: TableDefinition<&[u8], &[u8; 32]> = TableDefinition::new("LEAVES");
const BUCKETS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("BUCKETS");
const STATUS_INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("STATUS_INDEX");
const CHECKPOINTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("CHECKPOINTS");
const SEQ: TableDefinition<&[u8], &[u8; 8]> = TableDefinition::new("SEQ");

fn backend_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// `STATUS_INDEX` is a presence index; its value carries no information.
const EMPTY: &[u8] = &[];

/// The input shape for `Txn::insert_item`: everything about a normalized
/// event except the per-scope `seq`, which the store assigns.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub scope: Scope,
    pub bucket_key: BucketKey,
    pub provider: String,
    pub provider_event_id: String,
    pub issue_node_id: Option<String>,
    pub event_type: String,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payload_bytes: Vec<u8>,
    pub item_hash: ItemHash,
}

/// `GetItemForProof`'s result (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct ItemProofLookup {
    pub scope: Scope,
    pub bucket_key: BucketKey,
    pub seq: u64,
    pub item_hash: ItemHash,
}

#[derive(Clone)]
pub struct RedbBucketStore {
    db: std::sync::Arc<Database>,
}

impl RedbBucketStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(backend_err)?;
        {
            let w = db.begin_write().map_err(backend_err)?;
            w.open_table(ITEMS).map_err(backend_err)?;
            w.open_table(LEAVES).map_err(backend_err)?;
            w.open_table(BUCKETS).map_err(backend_err)?;
            w.open_table(STATUS_INDEX).map_err(backend_err)?;
            w.open_table(CHECKPOINTS).map_err(backend_err)?;
            w.open_table(SEQ).map_err(backend_err)?;
            w.commit().map_err(backend_err)?;
        }
        Ok(Self {
            db: std::sync::Arc::new(db),
        })
    }

    /// Runs `f` inside one `redb` write transaction and commits only if
    /// `f` returns `Ok`. This is the transaction boundary spec.md §4.4
    /// asks `AppendBatch` to use; every `Txn` method below can also be
    /// called standalone (e.g. C8's `mark_closed`/`set_anchored`) by
    /// wrapping a single call in its own transaction.
    pub fn with_write_txn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: for<'t> FnOnce(&Txn<'t>) -> Result<T, StorageError>,
    {
        let write = self.db.begin_write().map_err(backend_err)?;
        let result = {
            let txn = Txn { write: &write };
            f(&txn)?
        };
        write.commit().map_err(backend_err)?;
        Ok(result)
    }

    pub fn mark_closed(&self, scope: &Scope, bucket_key: &BucketKey) -> Result<bool, StorageError> {
        self.with_write_txn(|txn| txn.mark_closed(scope, bucket_key))
    }

    pub fn set_anchored(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        cid: String,
        anchored_tx: String,
    ) -> Result<bool, StorageError> {
        self.with_write_txn(|txn| txn.set_anchored(scope, bucket_key, cid, anchored_tx))
    }

    pub fn get_checkpoint(&self, scope: &Scope) -> Result<Option<Checkpoint>, StorageError> {
        let r = self.db.begin_read().map_err(backend_err)?;
        let t = r.open_table(CHECKPOINTS).map_err(backend_err)?;
        t.get(checkpoint_key(scope).as_slice())
            .map_err(backend_err)?
            .map(|v| decode_checkpoint(v.value()))
            .transpose()
    }

    pub fn get_bucket(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
    ) -> Result<Option<BucketView>, StorageError> {
        let r = self.db.begin_read().map_err(backend_err)?;
        let t = r.open_table(BUCKETS).map_err(backend_err)?;
        t.get(bucket_row_key(scope, bucket_key).as_slice())
            .map_err(backend_err)?
            .map(|v| BucketRow::decode(v.value()))
            .transpose()
            .map(|row| row.map(|row| to_view(scope.clone(), bucket_key.clone(), row)))
    }

    pub fn list_buckets_by_scope(&self, scope: &Scope) -> Result<Vec<BucketView>, StorageError> {
        let r = self.db.begin_read().map_err(backend_err)?;
        let t = r.open_table(BUCKETS).map_err(backend_err)?;
        let prefix = scope_prefix(scope);
        let mut out = Vec::new();
        for entry in t.range(prefix.as_slice()..).map_err(backend_err)? {
            let (k, v) = entry.map_err(backend_err)?;
            if !k.value().starts_with(prefix.as_slice()) {
                break;
            }
            let bucket_key_str = std::str::from_utf8(&k.value()[prefix.len()..])
                .map_err(|e| StorageError::Decode(e.to_string()))?
                .to_string();
            let bucket_key = BucketKey::parse(bucket_key_str).map_err(|e| StorageError::Decode(e.to_string()))?;
            let row = BucketRow::decode(v.value())?;
            out.push(to_view(scope.clone(), bucket_key, row));
        }
        Ok(out)
    }

    /// Pages through every bucket in `status`, ordered by the
    /// `STATUS_INDEX` key (i.e. by `(scope, bucket_key)` ascending within
    /// the status, per spec.md §4.3).
    pub fn list_buckets_by_status(
        &self,
        status: BucketStatus,
        limit: usize,
        page_token: Option<&PageToken>,
    ) -> Result<(Vec<BucketView>, Option<PageToken>), StorageError> {
        let r = self.db.begin_read().map_err(backend_err)?;
        let idx = r.open_table(STATUS_INDEX).map_err(backend_err)?;
        let buckets = r.open_table(BUCKETS).map_err(backend_err)?;
        let prefix = status_index_prefix(status);

        let start: Vec<u8> = match page_token {
            Some(tok) => {
                let mut decoded =
                    hex::decode(tok).map_err(|e| StorageError::Decode(e.to_string()))?;
                decoded.push(0x00); // exclusive-of-last-seen successor
                decoded
            }
            None => prefix.clone(),
        };

        let mut out = Vec::new();
        let mut last_key: Option<Vec<u8>> = None;
        let mut has_more = false;

        for entry in idx.range(start.as_slice()..).map_err(backend_err)? {
            let (k, _) = entry.map_err(backend_err)?;
            let key = k.value().to_vec();
            if !key.starts_with(&prefix) {
                break;
            }
            if out.len() == limit {
                has_more = true;
                break;
            }
            let row_key = strip_status_byte(&key);
            let bucket_key_str = std::str::from_utf8(&row_key[row_key.len() - 10..])
                .map_err(|e| StorageError::Decode(e.to_string()))?
                .to_string();
            let scope = decode_scope_from_row_key(row_key)?;
            let bucket_key =
                BucketKey::parse(bucket_key_str).map_err(|e| StorageError::Decode(e.to_string()))?;
            let row_bytes = buckets
                .get(row_key)
                .map_err(backend_err)?
                .ok_or(StorageError::NotFound)?;
            let row = BucketRow::decode(row_bytes.value())?;
            out.push(to_view(scope, bucket_key, row));
            last_key = Some(key);
        }

        let next_token = if has_more { last_key.map(hex::encode) } else { None };

        Ok((out, next_token))
    }

    pub fn get_item_for_proof(
        &self,
        provider_event_id: &str,
    ) -> Result<Option<ItemProofLookup>, StorageError> {
        let r = self.db.begin_read().map_err(backend_err)?;
        let t = r.open_table(ITEMS).map_err(backend_err)?;
        t.get(provider_event_id)
            .map_err(backend_err)?
            .map(|v| decode_item(provider_event_id, v.value()))
            .transpose()
            .map(|item| {
                item.map(|item| ItemProofLookup {
                    scope: item.scope,
                    bucket_key: item.bucket_key,
                    seq: item.seq,
                    item_hash: item.item_hash,
                })
            })
    }

    pub fn select_leaves(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
    ) -> Result<Vec<(u64, LeafHash)>, StorageError> {
        let r = self.db.begin_read().map_err(backend_err)?;
        let t = r.open_table(LEAVES).map_err(backend_err)?;
        let prefix = leaf_prefix(scope, bucket_key);
        let mut out = Vec::new();
        for entry in t.range(prefix.as_slice()..).map_err(backend_err)? {
            let (k, v) = entry.map_err(backend_err)?;
            if !k.value().starts_with(prefix.as_slice()) {
                break;
            }
            let leaf_index = leaf_index_suffix(k.value(), &prefix)?;
            out.push((leaf_index, LeafHash(*v.value())));
        }
        out.sort_by_key(|(idx, _)| *idx);
        Ok(out)
    }
}

fn decode_scope_from_row_key(row_key: &[u8]) -> Result<Scope, StorageError> {
    use crate::codec::Reader;
    let mut r = Reader::new(row_key);
    let entity_kind = r.str()?;
    let entity_key = r.str()?;
    Scope::new(entity_kind, entity_key).map_err(|e| StorageError::Decode(e.to_string()))
}

fn to_view(scope: Scope, bucket_key: BucketKey, row: BucketRow) -> BucketView {
    BucketView {
        scope,
        bucket_key,
        root_hash: row.root_hash,
        leaf_count: row.leaf_count,
        status: row.status,
        cid: row.cid,
        anchored_tx: row.anchored_tx,
        closed_at: row.closed_at,
        anchored_at: row.anchored_at,
    }
}

fn leaf_index_suffix(key: &[u8], prefix: &[u8]) -> Result<u64, StorageError> {
    let idx_bytes = &key[prefix.len()..];
    idx_bytes
        .try_into()
        .map(u64::from_be_bytes)
        .map_err(|_| StorageError::Decode("malformed leaf index".to_string()))
}

/// A single `redb` write transaction, exposing every mutating operation
/// spec.md §4.3/§4.4 needs. Each method opens its own table handle so
/// callers can freely mix operations without fighting borrow lifetimes —
/// the same style the teacher uses inside `seal_epoch`/`drop_sealed_epoch`.
pub struct Txn<'a> {
    write: &'a WriteTransaction<'a>,
}

impl Txn<'_> {
    /// Idempotent on `provider_event_id`: returns `Some(seq)` for a newly
    /// inserted row, `None` if the id already existed (spec.md §4.3).
    pub fn insert_item(&self, new: &NewItem) -> Result<Option<u64>, StorageError> {
        let mut items = self.write.open_table(ITEMS).map_err(backend_err)?;
        if items
            .get(new.provider_event_id.as_str())
            .map_err(backend_err)?
            .is_some()
        {
            return Ok(None);
        }

        let seq = self.next_seq(&new.scope)?;
        let item = Item {
            scope: new.scope.clone(),
            bucket_key: new.bucket_key.clone(),
            seq,
            provider: new.provider.clone(),
            provider_event_id: new.provider_event_id.clone(),
            issue_node_id: new.issue_node_id.clone(),
            event_type: new.event_type.clone(),
            actor: new.actor.clone(),
            created_at: new.created_at,
            payload_bytes: new.payload_bytes.clone(),
            item_hash: new.item_hash,
        };
        items
            .insert(new.provider_event_id.as_str(), encode_item(&item).as_slice())
            .map_err(backend_err)?;
        Ok(Some(seq))
    }

    fn next_seq(&self, scope: &Scope) -> Result<u64, StorageError> {
        let mut seq_tbl = self.write.open_table(SEQ).map_err(backend_err)?;
        let key = scope_prefix(scope);
        let current = seq_tbl
            .get(key.as_slice())
            .map_err(backend_err)?
            .map(|v| u64::from_be_bytes(*v.value()))
            .unwrap_or(0);
        let next = current + 1;
        seq_tbl.insert(key.as_slice(), &be64(next)).map_err(backend_err)?;
        Ok(next)
    }

    pub fn select_leaves(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
    ) -> Result<Vec<(u64, LeafHash)>, StorageError> {
        let t = self.write.open_table(LEAVES).map_err(backend_err)?;
        let prefix = leaf_prefix(scope, bucket_key);
        let mut out = Vec::new();
        for entry in t.range(prefix.as_slice()..).map_err(backend_err)? {
            let (k, v) = entry.map_err(backend_err)?;
            if !k.value().starts_with(prefix.as_slice()) {
                break;
            }
            let leaf_index = leaf_index_suffix(k.value(), &prefix)?;
            out.push((leaf_index, LeafHash(*v.value())));
        }
        out.sort_by_key(|(idx, _)| *idx);
        Ok(out)
    }

    /// Fails if `(scope, bucket_key, leaf_index)` already exists
    /// (spec.md §4.3).
    pub fn insert_leaf(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        leaf_index: u64,
        leaf_hash: LeafHash,
    ) -> Result<(), StorageError> {
        let mut t = self.write.open_table(LEAVES).map_err(backend_err)?;
        let key = leaf_key(scope, bucket_key, leaf_index);
        if t.get(key.as_slice()).map_err(backend_err)?.is_some() {
            return Err(StorageError::LeafAlreadyExists {
                bucket_key: bucket_key.as_str().to_string(),
                leaf_index,
            });
        }
        t.insert(key.as_slice(), leaf_hash.as_bytes())
            .map_err(backend_err)?;
        Ok(())
    }

    fn get_bucket_row(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
    ) -> Result<Option<BucketRow>, StorageError> {
        let t = self.write.open_table(BUCKETS).map_err(backend_err)?;
        t.get(bucket_row_key(scope, bucket_key).as_slice())
            .map_err(backend_err)?
            .map(|v| BucketRow::decode(v.value()))
            .transpose()
    }

    fn put_bucket_row(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        row: &BucketRow,
    ) -> Result<(), StorageError> {
        let mut t = self.write.open_table(BUCKETS).map_err(backend_err)?;
        t.insert(bucket_row_key(scope, bucket_key).as_slice(), row.encode().as_slice())
            .map_err(backend_err)?;
        Ok(())
    }

    fn reindex_status(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        old: Option<BucketStatus>,
        new: BucketStatus,
    ) -> Result<(), StorageError> {
        let mut idx = self.write.open_table(STATUS_INDEX).map_err(backend_err)?;
        if let Some(old) = old {
            if old != new {
                idx.remove(status_index_key(old, scope, bucket_key).as_slice())
                    .map_err(backend_err)?;
            }
        }
        idx.insert(status_index_key(new, scope, bucket_key).as_slice(), EMPTY)
            .map_err(backend_err)?;
        Ok(())
    }

    /// Creates the bucket row if missing (status `open`); otherwise sets
    /// `root_hash = new_root` and `leaf_count += appended_count`
    /// atomically, leaving `status` untouched. Rejects the mutation once
    /// the bucket is no longer `open`: `root_hash`/`leaf_count` are frozen
    /// from `closed` onward (spec.md §3), so a late-arriving item must not
    /// reopen them (spec.md §5).
    pub fn upsert_bucket_batch(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        new_root: RootHash,
        appended_count: u64,
    ) -> Result<(), StorageError> {
        match self.get_bucket_row(scope, bucket_key)? {
            Some(mut row) => {
                if row.status != BucketStatus::Open {
                    return Err(StorageError::BucketNotOpen {
                        bucket_key: bucket_key.as_str().to_string(),
                        status: row.status.as_str(),
                    });
                }
                row.root_hash = Some(new_root);
                row.leaf_count += appended_count;
                self.put_bucket_row(scope, bucket_key, &row)
            }
            None => {
                let mut row = BucketRow::new_open();
                row.root_hash = Some(new_root);
                row.leaf_count = appended_count;
                self.put_bucket_row(scope, bucket_key, &row)?;
                self.reindex_status(scope, bucket_key, None, BucketStatus::Open)
            }
        }
    }

    /// `open -> closed`. No-op (returns `false`) if already beyond `open`.
    pub fn mark_closed(&self, scope: &Scope, bucket_key: &BucketKey) -> Result<bool, StorageError> {
        let Some(mut row) = self.get_bucket_row(scope, bucket_key)? else {
            return Ok(false);
        };
        if row.status != BucketStatus::Open {
            return Ok(false);
        }
        let old = row.status;
        row.status = BucketStatus::Closed;
        row.closed_at = Some(Utc::now());
        self.put_bucket_row(scope, bucket_key, &row)?;
        self.reindex_status(scope, bucket_key, Some(old), BucketStatus::Closed)?;
        Ok(true)
    }

    /// `closed|needs_anchoring -> anchored`. Rejects (returns `false`) an
    /// attempt against an `open` or already-`anchored` bucket (spec.md
    /// §3's monotonic status invariant, exercised by S5).
    pub fn set_anchored(
        &self,
        scope: &Scope,
        bucket_key: &BucketKey,
        cid: String,
        anchored_tx: String,
    ) -> Result<bool, StorageError> {
        let Some(mut row) = self.get_bucket_row(scope, bucket_key)? else {
            return Ok(false);
        };
        if !row.status.can_transition_to(BucketStatus::Anchored) {
            return Ok(false);
        }
        let old = row.status;
        row.status = BucketStatus::Anchored;
        row.cid = Some(cid);
        row.anchored_tx = Some(anchored_tx);
        row.anchored_at = Some(Utc::now());
        self.put_bucket_row(scope, bucket_key, &row)?;
        self.reindex_status(scope, bucket_key, Some(old), BucketStatus::Anchored)?;
        Ok(true)
    }

    /// Upserts the per-scope checkpoint (spec.md §4.4 step 4). Called
    /// even when the batch inserted zero new items, so long as the
    /// transaction otherwise commits.
    pub fn upsert_checkpoint(
        &self,
        scope: &Scope,
        cursor: String,
        last_event_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut t = self.write.open_table(CHECKPOINTS).map_err(backend_err)?;
        let cp = Checkpoint {
            cursor,
            last_event_at,
            updated_at: Utc::now(),
        };
        t.insert(checkpoint_key(scope).as_slice(), encode_checkpoint(&cp).as_slice())
            .map_err(backend_err)?;
        Ok(())
    }
}

