//! Canonical event encoding (C1) and Merkle forest construction (C2) for
//! the Trustflow timeline engine.
//!
//! Everything in this crate is pure and synchronous: no I/O, no storage
//! knowledge. `trustflow-timeline` is the only caller.

pub mod hasher;
pub mod merkle;
pub mod value;

pub use hasher::{canonical_bytes, canonicalize_and_hash};
pub use merkle::{verify, InclusionProof, MerkleTree, ProofStep, Side};
pub use value::CanonValue;
