//! The anchor tick loop (spec.md §4.8), grounded on
//! `runner/runner.go`'s `Runner.tick`: auto-close stale open buckets,
//! then anchor every `closed`/`needs_anchoring` bucket.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use trustflow_storage::RedbBucketStore;
use trustflow_types::{BucketKey, BucketStatus, BucketView};

use crate::error::AnchorError;
use crate::sink::{ContentSink, LedgerSink};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_LIST_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct AnchorConfig {
    pub tick_interval: Duration,
    pub list_page_size: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}

/// The manifest anchored to the external sinks (spec.md §4.8 step 1).
#[derive(Debug, Serialize)]
struct Manifest<'a> {
    entity_kind: &'a str,
    entity_key: &'a str,
    bucket_key: &'a str,
    root_hash: Option<String>,
    leaf_count: u64,
    closed_at: Option<chrono::DateTime<chrono::Utc>>,
    status: &'static str,
}

pub struct AnchorRunner {
    config: AnchorConfig,
    store: Arc<RedbBucketStore>,
    content: Arc<dyn ContentSink>,
    ledger: Arc<dyn LedgerSink>,
}

impl AnchorRunner {
    pub fn new(
        config: AnchorConfig,
        store: Arc<RedbBucketStore>,
        content: Arc<dyn ContentSink>,
        ledger: Arc<dyn LedgerSink>,
    ) -> Self {
        Self {
            config,
            store,
            content,
            ledger,
        }
    }

    /// Runs ticks on `config.tick_interval` until `shutdown` fires. The
    /// first tick runs immediately, matching `Runner.Start`'s "run once
    /// before entering the ticker loop".
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        self.tick().await;

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        if let Err(err) = self.close_stale_open_buckets().await {
            error!(error = %err, "auto-close error");
        }
        for status in [BucketStatus::Closed, BucketStatus::NeedsAnchoring] {
            if let Err(err) = self.anchor_status(status).await {
                error!(status = %status, error = %err, "anchor sweep error");
            }
        }
    }

    async fn close_stale_open_buckets(&self) -> Result<(), AnchorError> {
        let today = BucketKey::today();
        let mut page_token = None;
        let mut total = 0u64;
        loop {
            let (buckets, next) = self.store.list_buckets_by_status(
                BucketStatus::Open,
                self.config.list_page_size,
                page_token.as_ref(),
            )?;
            for bucket in &buckets {
                if bucket.bucket_key < today {
                    match self.store.mark_closed(&bucket.scope, &bucket.bucket_key) {
                        Ok(true) => total += 1,
                        Ok(false) => {}
                        Err(err) => warn!(
                            scope = %bucket.scope,
                            bucket_key = %bucket.bucket_key,
                            error = %err,
                            "mark-closed failed"
                        ),
                    }
                }
            }
            if next.is_none() {
                break;
            }
            page_token = next;
        }
        if total > 0 {
            info!(total, "auto-closed stale open buckets");
        }
        Ok(())
    }

    async fn anchor_status(&self, status: BucketStatus) -> Result<(), AnchorError> {
        let mut page_token = None;
        let mut total = 0u64;
        loop {
            let (buckets, next) =
                self.store
                    .list_buckets_by_status(status, self.config.list_page_size, page_token.as_ref())?;
            for bucket in &buckets {
                match self.anchor_one(bucket).await {
                    Ok(()) => total += 1,
                    Err(err) => warn!(
                        scope = %bucket.scope,
                        bucket_key = %bucket.bucket_key,
                        error = %err,
                        "anchor failed, will retry next tick"
                    ),
                }
            }
            if next.is_none() {
                break;
            }
            page_token = next;
        }
        if total > 0 {
            info!(total, status = %status, "anchored buckets");
        }
        Ok(())
    }

    async fn anchor_one(&self, bucket: &BucketView) -> Result<(), AnchorError> {
        let manifest = Manifest {
            entity_kind: &bucket.scope.entity_kind,
            entity_key: &bucket.scope.entity_key,
            bucket_key: bucket.bucket_key.as_str(),
            root_hash: bucket.root_hash.map(|h| h.to_hex()),
            leaf_count: bucket.leaf_count,
            closed_at: bucket.closed_at,
            status: bucket.status.as_str(),
        };
        let raw = serde_json::to_vec(&manifest)
            .map_err(|e| AnchorError::ContentSink(e.to_string()))?;

        let cid = self.content.put(&raw).await?;
        let root_hash_hex = manifest.root_hash.clone().unwrap_or_default();
        let tx = self.ledger.submit(&cid, &root_hash_hex).await?;

        self.store
            .set_anchored(&bucket.scope, &bucket.bucket_key, cid, tx)?;
        Ok(())
    }
}

