//! C5 — Ingest Worker + C6 — Work Queue: fetch pages from the provider
//! using the per-scope checkpoint, normalize, and hand batches to the
//! Timeline Service, driven by a bounded queue and a fixed worker pool
//! (spec.md §4.5, §4.6).

mod error;
mod normalize;
mod provider;
mod queue;
mod worker;

pub use error::IngestError;
pub use normalize::normalize_node;
pub use provider::{GithubGraphQlClient, ProviderClient, ProviderPage, StaticTokenProvider, TokenProvider};
pub use queue::{spawn_pool, WorkQueueHandle, DEFAULT_QUEUE_SIZE, DEFAULT_WORKERS};
pub use worker::{IngestWorker, SAFETY_CAP};
