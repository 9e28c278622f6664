//! Prefix-encoded composite keys, grounded on the teacher's `k_versions`
//! / `k_changes` / `k_nodes` helpers: every key is built by concatenating
//! fixed- or length-prefixed components so that a prefix scan over a
//! partial key (e.g. "everything in this scope") is a plain lexicographic
//! range, exactly as `redb`'s `Table::range` expects.

use trustflow_types::{BucketKey, BucketStatus, Scope};

use crate::codec::push_str;

/// `entity_kind` and `entity_key` are each length-prefixed, so the
/// encoding self-delimits regardless of which bytes either contains.
pub fn scope_prefix(scope: &Scope) -> Vec<u8> {
    let mut out = Vec::new();
    push_str(&mut out, &scope.entity_kind);
    push_str(&mut out, &scope.entity_key);
    out
}

/// `BucketKey` is always exactly 10 ASCII bytes (`YYYY-MM-DD`, enforced by
/// `BucketKey::parse`), so it can be appended directly after a
/// self-delimiting scope prefix with no ambiguity.
pub fn bucket_row_key(scope: &Scope, bucket_key: &BucketKey) -> Vec<u8> {
    let mut out = scope_prefix(scope);
    out.extend_from_slice(bucket_key.as_str().as_bytes());
    out
}

pub fn leaf_key(scope: &Scope, bucket_key: &BucketKey, leaf_index: u64) -> Vec<u8> {
    let mut out = bucket_row_key(scope, bucket_key);
    out.extend_from_slice(&leaf_index.to_be_bytes());
    out
}

pub fn leaf_prefix(scope: &Scope, bucket_key: &BucketKey) -> Vec<u8> {
    bucket_row_key(scope, bucket_key)
}

pub fn checkpoint_key(scope: &Scope) -> Vec<u8> {
    scope_prefix(scope)
}

pub fn status_byte(status: BucketStatus) -> u8 {
    match status {
        BucketStatus::Open => 0,
        BucketStatus::Closed => 1,
        BucketStatus::NeedsAnchoring => 2,
        BucketStatus::Anchored => 3,
    }
}

/// `STATUS_INDEX` key: `[status_byte] ++ bucket_row_key`. Lets
/// `ListBucketsByStatus` range-scan a single status without touching rows
/// in other statuses.
pub fn status_index_key(status: BucketStatus, scope: &Scope, bucket_key: &BucketKey) -> Vec<u8> {
    let mut out = vec![status_byte(status)];
    out.extend_from_slice(&bucket_row_key(scope, bucket_key));
    out
}

pub fn status_index_prefix(status: BucketStatus) -> Vec<u8> {
    vec![status_byte(status)]
}

/// Strips the leading status byte a `STATUS_INDEX` key carries, returning
/// the plain `bucket_row_key` suitable for a `BUCKETS` lookup.
pub fn strip_status_byte(key: &[u8]) -> &[u8] {
    &key[1..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(kind: &str, key: &str) -> Scope {
        Scope::new(kind, key).unwrap()
    }

    #[test]
    fn scope_prefix_self_delimits_even_with_shared_byte_boundaries() {
        let a = scope_prefix(&scope("issue", "gh#7x"));
        let b = scope_prefix(&scope("issue", "gh#7"));
        // "gh#7x" vs "gh#7" must not collide after length-prefixing even
        // though one is a byte-prefix of the other.
        assert_ne!(a, b);
        assert!(!a.starts_with(&b) || a.len() == b.len());
    }

    #[test]
    fn leaf_keys_sort_in_index_order_within_a_bucket() {
        let s = scope("issue", "gh#7");
        let bk = BucketKey::parse("2025-01-10").unwrap();
        let k0 = leaf_key(&s, &bk, 0);
        let k1 = leaf_key(&s, &bk, 1);
        let k9 = leaf_key(&s, &bk, 9);
        assert!(k0 < k1);
        assert!(k1 < k9);
    }

    #[test]
    fn status_index_keys_group_by_status_first() {
        let s = scope("issue", "gh#7");
        let bk = BucketKey::parse("2025-01-10").unwrap();
        let open_key = status_index_key(BucketStatus::Open, &s, &bk);
        let closed_key = status_index_key(BucketStatus::Closed, &s, &bk);
        assert_eq!(open_key[0], 0);
        assert_eq!(closed_key[0], 1);
        assert_eq!(strip_status_byte(&open_key), bucket_row_key(&s, &bk));
    }
}
