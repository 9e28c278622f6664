//! Storage-layer error vocabulary, grounded on `StorageError` in the
//! teacher's `crates/api/src/storage/mod.rs` (a flat enum of backend /
//! not-found / decode variants, each mapped to from the raw `redb::Error`
//! with `.map_err(|e| StorageError::Backend(e.to_string()))`).

use thiserror::Error;
use trustflow_types::ErrorCode;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The embedded database returned an error opening, reading, or
    /// committing a transaction.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// A row this operation expected to already exist was not found.
    #[error("not found")]
    NotFound,
    /// `InsertLeaf` was asked to write a `(scope, bucket_key, leaf_index)`
    /// that already exists (spec.md §4.3).
    #[error("leaf already exists at index {leaf_index} for bucket {bucket_key}")]
    LeafAlreadyExists { bucket_key: String, leaf_index: u64 },
    /// A status transition was attempted that `BucketStatus::can_transition_to`
    /// rejects (spec.md §3's monotonic status invariant).
    #[error("cannot transition bucket {bucket_key} from {from} to {to}")]
    InvalidTransition {
        bucket_key: String,
        from: &'static str,
        to: &'static str,
    },
    /// `UpsertBucketBatch` was asked to change `root_hash`/`leaf_count` on a
    /// bucket whose status is no longer `open` (spec.md §3: those fields
    /// are frozen once a bucket leaves `open`; §5: a late append must abort).
    #[error("bucket {bucket_key} is {status}, not open; append rejected")]
    BucketNotOpen {
        bucket_key: String,
        status: &'static str,
    },
    /// A stored row's bytes did not decode under the storage layer's own
    /// fixed-shape encoding — on-disk corruption or a schema mismatch.
    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORAGE_BACKEND",
            Self::NotFound => "STORAGE_NOT_FOUND",
            Self::LeafAlreadyExists { .. } => "STORAGE_LEAF_ALREADY_EXISTS",
            Self::InvalidTransition { .. } => "STORAGE_INVALID_TRANSITION",
            Self::BucketNotOpen { .. } => "STORAGE_BUCKET_NOT_OPEN",
            Self::Decode(_) => "STORAGE_DECODE",
        }
    }
}
