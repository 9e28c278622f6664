use thiserror::Error;
use trustflow_storage::StorageError;
use trustflow_types::ErrorCode;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The content-addressable sink upload failed (spec.md §7
    /// `AnchorSinkError`): logged, bucket stays in its pre-anchor status,
    /// retried next tick.
    #[error("content sink upload failed: {0}")]
    ContentSink(String),
    /// The commitment ledger submission failed, same retry policy as
    /// `ContentSink`.
    #[error("ledger submission failed: {0}")]
    LedgerSink(String),
}

impl ErrorCode for AnchorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.code(),
            Self::ContentSink(_) => "ANCHOR_CONTENT_SINK",
            Self::LedgerSink(_) => "ANCHOR_LEDGER_SINK",
        }
    }
}
