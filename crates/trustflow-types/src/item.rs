//! `Item` — the canonical event row (spec.md §3) and the request-shaped
//! `Event` it is built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map as JsonMap;
use serde_json::Value;

use crate::bucket::BucketKey;
use crate::error::DataError;
use crate::hashes::ItemHash;
use crate::scope::Scope;

/// One normalized event, as accepted by `AppendBatch` (spec.md §6.1):
/// `{provider, provider_event_id, issue_node_id?, type, actor?, created_at, payload_json}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub provider: String,
    pub provider_event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_node_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_payload")]
    pub payload: JsonMap<String, Value>,
}

fn default_payload() -> JsonMap<String, Value> {
    JsonMap::new()
}

impl Event {
    /// Validates the event is well-formed enough to canonicalize and store.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.provider_event_id.trim().is_empty() {
            return Err(DataError::MissingProviderEventId);
        }
        Ok(())
    }

    /// The bucket key this event belongs to, per spec.md §3
    /// ("an item's `bucket_key` MUST equal `created_at.UTC()` formatted").
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::from_created_at(self.created_at)
    }
}

/// A stored item row (spec.md §3 Item). Never mutated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub scope: Scope,
    pub bucket_key: BucketKey,
    /// Monotonic per-scope sequence number, assigned at insert.
    pub seq: u64,
    pub provider: String,
    pub provider_event_id: String,
    pub issue_node_id: Option<String>,
    pub event_type: String,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Opaque bytes: the canonical encoding produced by `trustflow-canon`.
    pub payload_bytes: Vec<u8>,
    pub item_hash: ItemHash,
}

/// Pagination token for store listings, opaque to callers.
pub type PageToken = String;
