//! C4 — Timeline Service: idempotent ingestion into items/leaves/buckets
//! plus the read RPCs built on top of them (spec.md §4.4, SPEC_FULL.md §2.1).

mod error;
mod service;

pub use error::TimelineError;
pub use service::{AppendBatchRequest, AppendBatchResponse, CheckpointView, TimelineService};
