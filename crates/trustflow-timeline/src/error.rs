//! Error vocabulary for the Timeline RPC surface (spec.md §7).

use thiserror::Error;
use trustflow_storage::StorageError;
use trustflow_types::{DataError, ErrorCode};

#[derive(Debug, Error)]
pub enum TimelineError {
    /// Missing scope, malformed timestamp, or similar caller mistake
    /// (spec.md §7 `InvalidInput`) — surfaced, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The storage layer failed; safe to retry the whole batch because
    /// item insertion is idempotent on `provider_event_id` (spec.md §7
    /// `TransientStorage`).
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// `InclusionProof`/`GetBucket` asked about a row that doesn't exist.
    #[error("not found")]
    NotFound,
    /// `InclusionProof` was asked about a bucket ref that doesn't match
    /// the item's actual bucket.
    #[error("item is not in the requested bucket")]
    ItemNotInRequestedBucket,
    /// The bucket has no leaves to prove against.
    #[error("bucket has no leaves")]
    NoLeavesInBucket,
    /// The item's hash was not found among its bucket's leaves — should
    /// not happen if `AppendBatch`'s invariants hold, but surfaced rather
    /// than panicking.
    #[error("leaf for item not found in its bucket")]
    LeafNotFoundInBucket,
}

impl From<DataError> for TimelineError {
    fn from(e: DataError) -> Self {
        TimelineError::InvalidInput(e.to_string())
    }
}

impl ErrorCode for TimelineError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "TIMELINE_INVALID_INPUT",
            Self::Storage(e) => e.code(),
            Self::NotFound => "TIMELINE_NOT_FOUND",
            Self::ItemNotInRequestedBucket => "TIMELINE_ITEM_NOT_IN_BUCKET",
            Self::NoLeavesInBucket => "TIMELINE_NO_LEAVES_IN_BUCKET",
            Self::LeafNotFoundInBucket => "TIMELINE_LEAF_NOT_FOUND",
        }
    }
}
