//! Per-scope ingestion checkpoint (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque pagination state that makes ingestion resumable and idempotent.
/// Empty `cursor` means "from the beginning".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub cursor: String,
    pub last_event_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            cursor: String::new(),
            last_event_at: None,
            updated_at: now,
        }
    }
}
