//! In-memory refresh instruction (spec.md §3). Never persisted.

use chrono::{DateTime, Utc};

use crate::scope::Scope;

/// Describes which scope the ingest worker pool should re-fetch. Produced by
/// the webhook front door (C7) or a continuation from the ingest worker (C5),
/// consumed by the work queue (C6).
#[derive(Debug, Clone)]
pub struct RefreshInstruction {
    pub scope: Scope,
    pub delivery_id: String,
    pub received_at: DateTime<Utc>,
}
