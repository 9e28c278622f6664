//! Anchor Runner (C8): periodic auto-close + anchor tick over closed
//! buckets (spec.md §4.8).

mod error;
mod runner;
mod sink;

pub use error::AnchorError;
pub use runner::{AnchorConfig, AnchorRunner, DEFAULT_LIST_PAGE_SIZE, DEFAULT_TICK_INTERVAL};
pub use sink::{ContentSink, DevContentSink, DevLedgerSink, LedgerSink};
