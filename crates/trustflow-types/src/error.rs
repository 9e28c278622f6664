//! Shared error vocabulary for the Trustflow core.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
///
/// Every error enum in the workspace implements this so logs and the
/// webhook's JSON error body carry a code that doesn't shift when the
/// human-readable message is reworded.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors raised while constructing or validating core data-model values
/// (`Scope`, `BucketKey`, `Item`) independent of any storage backend.
#[derive(Debug, Error)]
pub enum DataError {
    /// `entity_kind` or `entity_key` was empty.
    #[error("scope is missing entity_kind or entity_key")]
    MissingScope,
    /// A bucket key did not match the `YYYY-MM-DD` shape required by spec.
    #[error("invalid bucket key {0:?}: expected YYYY-MM-DD")]
    InvalidBucketKey(String),
    /// A timestamp could not be parsed as RFC 3339.
    #[error("invalid RFC3339 timestamp: {0}")]
    InvalidTimestamp(String),
    /// An item was submitted with no `provider_event_id`.
    #[error("item is missing provider_event_id")]
    MissingProviderEventId,
    /// An item's `payload` could not be interpreted as a JSON object.
    #[error("item payload must be a JSON object")]
    PayloadNotObject,
}

impl ErrorCode for DataError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingScope => "DATA_MISSING_SCOPE",
            Self::InvalidBucketKey(_) => "DATA_INVALID_BUCKET_KEY",
            Self::InvalidTimestamp(_) => "DATA_INVALID_TIMESTAMP",
            Self::MissingProviderEventId => "DATA_MISSING_PROVIDER_EVENT_ID",
            Self::PayloadNotObject => "DATA_PAYLOAD_NOT_OBJECT",
        }
    }
}
