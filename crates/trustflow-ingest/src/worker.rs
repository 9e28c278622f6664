//! C5 — Ingest Worker: one refresh-instruction invocation (spec.md §4.5).
//!
//! Grounded on `worker.go`'s `Consumer`: mint a token, load the
//! checkpoint, page through the provider, normalize, append, and stop
//! either at `has_next_page == false` or the 1000-item safety cap,
//! re-enqueuing a continuation in the latter case.

use std::sync::Arc;

use tracing::{info, warn};

use trustflow_timeline::{AppendBatchRequest, TimelineService};
use trustflow_types::RefreshInstruction;

use crate::error::IngestError;
use crate::normalize::normalize_node;
use crate::provider::{ProviderClient, TokenProvider};
use crate::queue::WorkQueueHandle;

/// After this many items processed in one invocation, stop and enqueue a
/// continuation rather than keep paging indefinitely (spec.md §4.5 step e).
pub const SAFETY_CAP: usize = 1000;
const DEFAULT_PAGE_SIZE: u32 = 100;

pub struct IngestWorker<P: ProviderClient, T: TokenProvider> {
    provider: P,
    tokens: T,
    timeline: Arc<TimelineService>,
    queue: WorkQueueHandle,
    page_size: u32,
}

impl<P: ProviderClient, T: TokenProvider> IngestWorker<P, T> {
    pub fn new(provider: P, tokens: T, timeline: Arc<TimelineService>, queue: WorkQueueHandle) -> Self {
        Self {
            provider,
            tokens,
            timeline,
            queue,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Runs one invocation to completion. Errors are for the caller to log
    /// (spec.md §7: "C5 logs and exits; the next refresh resumes from the
    /// stored checkpoint") — nothing here retries within the invocation.
    pub async fn run(&self, instr: RefreshInstruction) -> Result<(), IngestError> {
        let token = self.tokens.token_for(&instr.scope).await?;

        let checkpoint = self.timeline.get_checkpoint(&instr.scope)?;
        let mut cursor = checkpoint.cursor;
        let mut issue_node_id: Option<String> = None;
        let mut total = 0usize;

        loop {
            let page = self
                .provider
                .fetch_page(&token, &instr.scope, &cursor, self.page_size)
                .await?;

            if issue_node_id.is_none() {
                issue_node_id = page.issue_node_id.clone();
            }
            let issue_node_id = issue_node_id.as_deref().unwrap_or_default();

            let provider = provider_of(&instr.scope);
            let items = page
                .items
                .iter()
                .map(|node| normalize_node(provider, issue_node_id, node))
                .collect::<Result<Vec<_>, _>>()?;

            let batch_len = items.len();
            let response = self.timeline.append_batch(AppendBatchRequest {
                scope: instr.scope.clone(),
                items,
                end_cursor: page.end_cursor.clone(),
            })?;

            total += batch_len;
            info!(
                scope = %instr.scope,
                delivery_id = %instr.delivery_id,
                fetched = batch_len,
                inserted = response.inserted,
                cursor = %response.latest_cursor,
                "ingested page"
            );

            if !page.has_next_page {
                break;
            }
            cursor = page.end_cursor;

            if total >= SAFETY_CAP {
                warn!(
                    scope = %instr.scope,
                    total,
                    "safety cap reached; enqueuing continuation"
                );
                self.queue.try_enqueue(RefreshInstruction {
                    scope: instr.scope.clone(),
                    delivery_id: instr.delivery_id.clone(),
                    received_at: instr.received_at,
                });
                break;
            }
        }

        Ok(())
    }
}

/// `entity_key` is `"<provider>#<id>"` (spec.md §3); `provider` is
/// whatever precedes the first `#`, defaulting to `"github"` for scopes
/// that predate the convention (there is only one provider today).
fn provider_of(scope: &trustflow_types::Scope) -> &str {
    scope
        .entity_key
        .split_once('#')
        .map(|(provider, _)| provider)
        .unwrap_or("github")
}
