//! External sink traits consumed by the anchor loop (spec.md §6.4/§6.5),
//! plus the development stubs that let C8 run with no external services.
//!
//! Grounded on `dataserver/buckets.go`'s `DevCID`/`DevTX` helpers.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::AnchorError;

/// `Put(bytes) -> cid` (spec.md §6.4). Must be deterministic on content.
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn put(&self, bytes: &[u8]) -> Result<String, AnchorError>;
}

/// `Submit(cid, root_hash) -> tx_id` (spec.md §6.5).
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn submit(&self, cid: &str, root_hash: &str) -> Result<String, AnchorError>;
}

/// `"devcid-" ++ hex(sha256(bytes)[:8])`, matching spec.md §6.4's stub
/// contract and `DevCID`.
#[derive(Debug, Default)]
pub struct DevContentSink;

#[async_trait]
impl ContentSink for DevContentSink {
    async fn put(&self, bytes: &[u8]) -> Result<String, AnchorError> {
        let digest = Sha256::digest(bytes);
        Ok(format!("devcid-{}", hex::encode(&digest[..8])))
    }
}

/// Monotonic synthetic tx id, matching spec.md §6.5's stub contract and
/// `DevTX`.
#[derive(Debug, Default)]
pub struct DevLedgerSink {
    counter: AtomicU64,
}

#[async_trait]
impl LedgerSink for DevLedgerSink {
    async fn submit(&self, _cid: &str, _root_hash: &str) -> Result<String, AnchorError> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("anchored-{seq}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn content_sink_is_deterministic_on_content() {
        let sink = DevContentSink;
        let a = sink.put(b"hello").await.unwrap();
        let b = sink.put(b"hello").await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("devcid-"));
    }

    #[tokio::test]
    async fn ledger_sink_ids_are_monotonic() {
        let sink = DevLedgerSink::default();
        let a = sink.submit("cid-1", "root-1").await.unwrap();
        let b = sink.submit("cid-1", "root-1").await.unwrap();
        assert_ne!(a, b);
    }
}
