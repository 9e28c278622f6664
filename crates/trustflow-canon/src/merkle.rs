//! C2 — Merkle forest builder (spec.md §4.2).
//!
//! Grounded on `examples/original_source/data_server/internal/service/crypto/merkle.go`:
//! duplicate-the-last-leaf-on-odd-count pairing, `parent = sha256(left || right)`
//! over the leaf hashes themselves, with a single-leaf bucket rooting to
//! that leaf hash unchanged (spec.md §4.2's single-leaf root convention).

use sha2::{Digest, Sha256};
use trustflow_types::{LeafHash, RootHash};

/// One step of an inclusion proof: the sibling hash and which side it sits
/// on relative to the node being proven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: [u8; 32],
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A sibling path from a leaf up to the root, plus enough bookkeeping to
/// verify it independently of the tree that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    pub leaf: LeafHash,
    pub leaf_index: usize,
    pub steps: Vec<ProofStep>,
    pub root: RootHash,
}

/// The full set of internal levels built from a leaf list, kept around so a
/// caller can pull proofs for more than one leaf without rebuilding.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// `levels[0]` is the leaf level; `levels.last()` has exactly one node,
    /// the root.
    levels: Vec<Vec<[u8; 32]>>,
}

fn parent_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

impl MerkleTree {
    /// Builds a tree over `leaves` in the given order. `leaves` MUST already
    /// be ordered by ascending `(seq)` within the bucket (spec.md §4.2:
    /// "leaves MUST be ordered by the same deterministic order used to
    /// select them"). Returns `None` for an empty leaf set — an empty
    /// bucket has no root (spec.md §4.3: empty buckets are never closed).
    pub fn build(leaves: &[LeafHash]) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }
        let mut level: Vec<[u8; 32]> = leaves.iter().map(|l| *l.as_bytes()).collect();
        let mut levels = vec![level.clone()];

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut i = 0;
            while i < level.len() {
                let left = &level[i];
                // Odd node count: duplicate the last node as its own sibling.
                let right = if i + 1 < level.len() {
                    &level[i + 1]
                } else {
                    left
                };
                next.push(parent_hash(left, right));
                i += 2;
            }
            levels.push(next.clone());
            level = next;
        }

        Some(MerkleTree { levels })
    }

    pub fn root(&self) -> RootHash {
        RootHash(
            *self
                .levels
                .last()
                .and_then(|top| top.first())
                .expect("build() guarantees at least one level with one node"),
        )
    }

    /// Builds the sibling path for the leaf at `index`, per spec.md §4.2's
    /// "given a bucket_key and a leaf index, produce a sibling path that a
    /// verifier can replay to the stored root."
    pub fn proof(&self, leaves: &[LeafHash], index: usize) -> Option<InclusionProof> {
        let leaf = *leaves.get(index)?;
        let mut steps = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = if sibling_idx < level.len() {
                level[sibling_idx]
            } else {
                // Odd tail: the node was paired with itself.
                level[idx]
            };
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            steps.push(ProofStep { sibling, side });
            idx /= 2;
        }

        Some(InclusionProof {
            leaf,
            leaf_index: index,
            steps,
            root: self.root(),
        })
    }
}

/// Replays `proof` from its leaf up to a root and reports whether it
/// matches `proof.root`. A verifier holds only the proof and an
/// independently-obtained root (e.g. from the anchored sink) — this
/// function never touches the full tree.
pub fn verify(proof: &InclusionProof) -> bool {
    let mut current = *proof.leaf.as_bytes();
    for step in &proof.steps {
        current = match step.side {
            Side::Left => parent_hash(&step.sibling, &current),
            Side::Right => parent_hash(&current, &step.sibling),
        };
    }
    current == *proof.root.as_bytes()
}

/// Computes just the root for `leaves`, for callers that don't need proofs.
pub fn root_of(leaves: &[LeafHash]) -> Option<RootHash> {
    MerkleTree::build(leaves).map(|t| t.root())
}
