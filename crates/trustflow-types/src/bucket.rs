//! `Bucket` — time-window grouping of items within a scope (spec.md §3).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DataError;
use crate::hashes::RootHash;
use crate::scope::Scope;

/// An ordered string that groups items into a time window:
/// `created_at.UTC().format("YYYY-MM-DD")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey(String);

impl BucketKey {
    /// Derives the bucket key for a timestamp: the UTC calendar date.
    pub fn from_created_at(created_at: DateTime<Utc>) -> Self {
        Self(created_at.format("%Y-%m-%d").to_string())
    }

    /// Parses and validates an already-formatted bucket key string.
    pub fn parse(s: impl Into<String>) -> Result<Self, DataError> {
        let s = s.into();
        if NaiveDate::parse_from_str(&s, "%Y-%m-%d").is_err() {
            return Err(DataError::InvalidBucketKey(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Today's bucket key in UTC, used by the auto-close policy (spec.md §4.8).
    pub fn today() -> Self {
        Self::from_created_at(Utc::now())
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Monotonic bucket lifecycle: `open -> closed -> (needs_anchoring) -> anchored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketStatus {
    Open,
    Closed,
    NeedsAnchoring,
    Anchored,
}

impl BucketStatus {
    /// True if `self -> next` is a legal transition under spec.md §3's
    /// monotonic status invariant.
    pub fn can_transition_to(self, next: BucketStatus) -> bool {
        use BucketStatus::*;
        matches!(
            (self, next),
            (Open, Closed)
                | (Closed, NeedsAnchoring)
                | (Closed, Anchored)
                | (NeedsAnchoring, Anchored)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BucketStatus::Open => "open",
            BucketStatus::Closed => "closed",
            BucketStatus::NeedsAnchoring => "needs_anchoring",
            BucketStatus::Anchored => "anchored",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(BucketStatus::Open),
            "closed" => Some(BucketStatus::Closed),
            "needs_anchoring" => Some(BucketStatus::NeedsAnchoring),
            "anchored" => Some(BucketStatus::Anchored),
            _ => None,
        }
    }
}

impl fmt::Display for BucketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only projection of a bucket row, used by the RPC surface
/// (spec.md §4.3 `GetBucket`/`ListBucketsByScope`/`ListBucketsByStatus`,
/// SPEC_FULL.md §2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketView {
    pub scope: Scope,
    pub bucket_key: BucketKey,
    pub root_hash: Option<RootHash>,
    pub leaf_count: u64,
    pub status: BucketStatus,
    pub cid: Option<String>,
    pub anchored_tx: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub anchored_at: Option<DateTime<Utc>>,
}
