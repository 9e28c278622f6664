//! Core data model and shared error vocabulary for the Trustflow
//! tamper-evident timeline engine.
//!
//! This crate has no knowledge of storage, HTTP, or the provider API; it
//! only defines the shapes every other crate agrees on.

pub mod bucket;
pub mod checkpoint;
pub mod error;
pub mod hashes;
pub mod item;
pub mod refresh;
pub mod scope;

pub use bucket::{BucketKey, BucketStatus, BucketView};
pub use checkpoint::Checkpoint;
pub use error::{DataError, ErrorCode};
pub use hashes::{ItemHash, LeafHash, RootHash};
pub use item::{Event, Item, PageToken};
pub use refresh::RefreshInstruction;
pub use scope::Scope;
