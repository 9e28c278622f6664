//! C1 — Canonical Hasher (spec.md §4.1).
//!
//! Grounded on `examples/original_source/data_server/internal/service/crypto/hash_dagcbor.go`:
//! the same field set (`provider`, `provider_event_id`, `issue_node_id?`,
//! `type`, `actor?`, `created_at`, `payload`), the same omit-don't-null rule
//! for optional fields, and RFC3339 timestamps. The wire format differs
//! (see SPEC_FULL.md §3.1) but the digest is byte-for-byte reproducible
//! given the same logical event.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};
use trustflow_types::{Event, ItemHash};

use crate::value::CanonValue;

/// Canonically encodes `event` and returns `(encoded_bytes, sha256(encoded_bytes))`.
///
/// Two logically equal events — including ones whose `payload` maps were
/// constructed with differently ordered keys — produce byte-identical
/// output (spec.md §8 property 4).
pub fn canonicalize_and_hash(event: &Event) -> (Vec<u8>, ItemHash) {
    let bytes = canonical_bytes(event);
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    (bytes, ItemHash(digest))
}

/// Just the canonical bytes, with no hashing. Exposed for tests and for
/// inclusion-proof tooling that wants to show the pre-image.
pub fn canonical_bytes(event: &Event) -> Vec<u8> {
    event_to_canon(event).to_bytes()
}

fn event_to_canon(event: &Event) -> CanonValue {
    let mut fields: Vec<(String, CanonValue)> = vec![
        ("provider".to_string(), CanonValue::Text(event.provider.clone())),
        (
            "provider_event_id".to_string(),
            CanonValue::Text(event.provider_event_id.clone()),
        ),
        ("type".to_string(), CanonValue::Text(event.event_type.clone())),
        (
            "created_at".to_string(),
            CanonValue::Text(event.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ),
        (
            "payload".to_string(),
            CanonValue::from_json(&serde_json::Value::Object(event.payload.clone())),
        ),
    ];

    // Absent optional fields are omitted entirely, never encoded as null
    // (spec.md §4.1).
    if let Some(issue_node_id) = &event.issue_node_id {
        fields.push((
            "issue_node_id".to_string(),
            CanonValue::Text(issue_node_id.clone()),
        ));
    }
    if let Some(actor) = &event.actor {
        fields.push(("actor".to_string(), CanonValue::Text(actor.clone())));
    }

    CanonValue::map(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn event(payload: serde_json::Value, actor: Option<&str>) -> Event {
        Event {
            provider: "github".to_string(),
            provider_event_id: "A".to_string(),
            issue_node_id: None,
            event_type: "IssueComment".to_string(),
            actor: actor.map(str::to_string),
            created_at: DateTime::parse_from_rfc3339("2025-01-10T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            payload: payload.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn absent_optional_fields_are_omitted_not_null() {
        let bytes = canonical_bytes(&event(json!({}), None));
        // A map with actor=null would contain the 4-byte "actor" text tag
        // followed by a null tag; omission means that byte sequence never
        // appears, and the encoded map has exactly 4 top-level entries.
        assert!(!bytes.windows(5).any(|w| w == b"actor"));
    }

    #[test]
    fn equal_events_with_reordered_payload_keys_hash_identically() {
        let (_, h1) = canonicalize_and_hash(&event(json!({"a": 1, "b": 2}), Some("alice")));
        let (_, h2) = canonicalize_and_hash(&event(json!({"b": 2, "a": 1}), Some("alice")));
        assert_eq!(h1.as_bytes(), h2.as_bytes());
    }

    #[test]
    fn different_actor_changes_the_hash() {
        let (_, h1) = canonicalize_and_hash(&event(json!({}), Some("alice")));
        let (_, h2) = canonicalize_and_hash(&event(json!({}), Some("bob")));
        assert_ne!(h1.as_bytes(), h2.as_bytes());
    }

    #[test]
    fn tampering_with_payload_changes_the_item_hash() {
        let (_, h1) = canonicalize_and_hash(&event(json!({"label": "bug"}), None));
        let (_, h2) = canonicalize_and_hash(&event(json!({"label": "bugfix"}), None));
        assert_ne!(h1.as_bytes(), h2.as_bytes());
    }
}
