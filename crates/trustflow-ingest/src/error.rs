//! Error vocabulary for the ingest side (spec.md §7: `TransientUpstream`
//! and friends — C5 logs and aborts the invocation rather than surfacing
//! these, but they're still typed so the log line carries a stable code).

use thiserror::Error;
use trustflow_timeline::TimelineError;
use trustflow_types::ErrorCode;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Minting a short-lived provider token failed.
    #[error("token acquisition failed: {0}")]
    Token(String),
    /// The provider fetch returned an error, timed out, or the response
    /// could not be parsed as the expected page shape.
    #[error("provider fetch failed: {0}")]
    Fetch(String),
    /// A page node was missing a field normalization requires (spec.md §4.5).
    #[error("malformed provider node: {0}")]
    Normalize(String),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

impl ErrorCode for IngestError {
    fn code(&self) -> &'static str {
        match self {
            Self::Token(_) => "INGEST_TOKEN",
            Self::Fetch(_) => "INGEST_FETCH",
            Self::Normalize(_) => "INGEST_NORMALIZE",
            Self::Timeline(e) => e.code(),
        }
    }
}
