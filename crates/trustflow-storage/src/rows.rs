//! On-disk row shapes and their manual encodings (spec.md §6.7's logical
//! tables, reduced to fixed-shape byte tuples per the codec module's
//! rationale).

use chrono::{DateTime, TimeZone, Utc};

use trustflow_types::{BucketStatus, Checkpoint, Item, ItemHash, RootHash, Scope};

use crate::codec::{push_opt_i64, push_opt_str, push_str, Reader};
use crate::error::StorageError;
use crate::keys::status_byte;

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::Decode(format!("invalid millisecond timestamp {ms}")))
}

/// A bucket row as stored in the `BUCKETS` table (spec.md §3 Bucket).
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRow {
    pub root_hash: Option<RootHash>,
    pub leaf_count: u64,
    pub status: BucketStatus,
    pub cid: Option<String>,
    pub anchored_tx: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub anchored_at: Option<DateTime<Utc>>,
}

impl BucketRow {
    pub fn new_open() -> Self {
        Self {
            root_hash: None,
            leaf_count: 0,
            status: BucketStatus::Open,
            cid: None,
            anchored_tx: None,
            closed_at: None,
            anchored_at: None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match &self.root_hash {
            Some(h) => {
                out.push(1);
                out.extend_from_slice(h.as_bytes());
            }
            None => out.push(0),
        }
        out.extend_from_slice(&self.leaf_count.to_be_bytes());
        out.push(status_byte(self.status));
        push_opt_str(&mut out, &self.cid);
        push_opt_str(&mut out, &self.anchored_tx);
        push_opt_i64(&mut out, &self.closed_at.map(to_millis));
        push_opt_i64(&mut out, &self.anchored_at.map(to_millis));
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        let mut r = Reader::new(bytes);
        let root_hash = if r.u8()? == 1 {
            Some(RootHash(r.array32()?))
        } else {
            None
        };
        let leaf_count = r.u64()?;
        let status = match r.u8()? {
            0 => BucketStatus::Open,
            1 => BucketStatus::Closed,
            2 => BucketStatus::NeedsAnchoring,
            3 => BucketStatus::Anchored,
            other => return Err(StorageError::Decode(format!("unknown status byte {other}"))),
        };
        let cid = r.opt_str()?;
        let anchored_tx = r.opt_str()?;
        let closed_at = r.opt_i64()?.map(from_millis).transpose()?;
        let anchored_at = r.opt_i64()?.map(from_millis).transpose()?;
        Ok(Self {
            root_hash,
            leaf_count,
            status,
            cid,
            anchored_tx,
            closed_at,
            anchored_at,
        })
    }
}

/// The `ITEMS` table value (spec.md §6.7), keyed externally by
/// `provider_event_id`.
pub fn encode_item(item: &Item) -> Vec<u8> {
    let mut out = Vec::new();
    push_str(&mut out, &item.scope.entity_kind);
    push_str(&mut out, &item.scope.entity_key);
    push_str(&mut out, item.bucket_key.as_str());
    out.extend_from_slice(&item.seq.to_be_bytes());
    push_str(&mut out, &item.provider);
    push_opt_str(&mut out, &item.issue_node_id);
    push_str(&mut out, &item.event_type);
    push_opt_str(&mut out, &item.actor);
    out.extend_from_slice(&to_millis(item.created_at).to_be_bytes());
    out.extend_from_slice(&(item.payload_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(&item.payload_bytes);
    out.extend_from_slice(item.item_hash.as_bytes());
    out
}

pub fn decode_item(provider_event_id: &str, bytes: &[u8]) -> Result<Item, StorageError> {
    let mut r = Reader::new(bytes);
    let entity_kind = r.str()?;
    let entity_key = r.str()?;
    let bucket_key = r.str()?;
    let seq = r.u64()?;
    let provider = r.str()?;
    let issue_node_id = r.opt_str()?;
    let event_type = r.str()?;
    let actor = r.opt_str()?;
    let created_at = from_millis(r.i64()?)?;
    let payload_bytes = r.bytes()?;
    let item_hash = ItemHash(r.array32()?);

    Ok(Item {
        scope: Scope::new(entity_kind, entity_key)
            .map_err(|e| StorageError::Decode(e.to_string()))?,
        bucket_key: trustflow_types::BucketKey::parse(bucket_key)
            .map_err(|e| StorageError::Decode(e.to_string()))?,
        seq,
        provider,
        provider_event_id: provider_event_id.to_string(),
        issue_node_id,
        event_type,
        actor,
        created_at,
        payload_bytes,
        item_hash,
    })
}

/// The `CHECKPOINTS` table value (spec.md §3 Checkpoint).
pub fn encode_checkpoint(cp: &Checkpoint) -> Vec<u8> {
    let mut out = Vec::new();
    push_str(&mut out, &cp.cursor);
    push_opt_i64(&mut out, &cp.last_event_at.map(to_millis));
    out.extend_from_slice(&to_millis(cp.updated_at).to_be_bytes());
    out
}

pub fn decode_checkpoint(bytes: &[u8]) -> Result<Checkpoint, StorageError> {
    let mut r = Reader::new(bytes);
    let cursor = r.str()?;
    let last_event_at = r.opt_i64()?.map(from_millis).transpose()?;
    let updated_at = from_millis(r.i64()?)?;
    Ok(Checkpoint {
        cursor,
        last_event_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustflow_types::BucketKey;

    #[test]
    fn bucket_row_round_trips_open_and_anchored() {
        let open = BucketRow::new_open();
        assert_eq!(BucketRow::decode(&open.encode()).unwrap(), open);

        let anchored = BucketRow {
            root_hash: Some(RootHash([7u8; 32])),
            leaf_count: 12,
            status: BucketStatus::Anchored,
            cid: Some("devcid-ab".to_string()),
            anchored_tx: Some("tx-1".to_string()),
            closed_at: Some(Utc.timestamp_millis_opt(1_000).unwrap()),
            anchored_at: Some(Utc.timestamp_millis_opt(2_000).unwrap()),
        };
        assert_eq!(BucketRow::decode(&anchored.encode()).unwrap(), anchored);
    }

    #[test]
    fn item_round_trips() {
        let item = Item {
            scope: Scope::new("issue", "github#7").unwrap(),
            bucket_key: BucketKey::parse("2025-01-10").unwrap(),
            seq: 3,
            provider: "github".to_string(),
            provider_event_id: "A".to_string(),
            issue_node_id: Some("I_1".to_string()),
            event_type: "IssueComment".to_string(),
            actor: None,
            created_at: Utc.timestamp_millis_opt(123_000).unwrap(),
            payload_bytes: vec![1, 2, 3],
            item_hash: ItemHash([9u8; 32]),
        };
        let decoded = decode_item("A", &encode_item(&item)).unwrap();
        assert_eq!(decoded.provider_event_id, "A");
        assert_eq!(decoded.scope, item.scope);
        assert_eq!(decoded.payload_bytes, item.payload_bytes);
        assert_eq!(decoded.item_hash.as_bytes(), item.item_hash.as_bytes());
    }
}
