//! Node normalization (spec.md §4.5 step b).
//!
//! Grounded on `worker.go`'s normalization loop: lift `__typename`, `id`,
//! `createdAt`, `actor.login ?? author.login` out of the raw node, and
//! keep everything else as `payload` (SPEC_FULL.md §3's single
//! normalization rule — no per-provider branching).

use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value};

use trustflow_types::Event;

use crate::error::IngestError;
use crate::provider::ProviderNode;

const LIFTED_FIELDS: [&str; 5] = ["__typename", "id", "createdAt", "actor", "author"];

/// Normalizes one raw provider node into the canonical `Event` shape
/// `AppendBatch` accepts.
pub fn normalize_node(
    provider: &str,
    issue_node_id: &str,
    node: &ProviderNode,
) -> Result<Event, IngestError> {
    let event_type = node
        .get("__typename")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::Normalize("node is missing __typename".to_string()))?
        .to_string();

    let provider_event_id = node
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::Normalize("node is missing id".to_string()))?
        .to_string();

    let created_at = node
        .get("createdAt")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::Normalize("node is missing createdAt".to_string()))
        .and_then(parse_rfc3339)?;

    // Single rule: `actor.login ?? author.login`, first match wins.
    let actor = login_of(node, "actor").or_else(|| login_of(node, "author"));

    let mut payload = JsonMap::new();
    for (key, value) in node {
        if LIFTED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        payload.insert(key.clone(), value.clone());
    }

    Ok(Event {
        provider: provider.to_string(),
        provider_event_id,
        issue_node_id: Some(issue_node_id.to_string()),
        event_type,
        actor,
        created_at,
        payload,
    })
}

fn login_of(node: &ProviderNode, field: &str) -> Option<String> {
    node.get(field)?
        .as_object()?
        .get("login")?
        .as_str()
        .map(str::to_string)
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, IngestError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IngestError::Normalize(format!("invalid RFC3339 timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(extra: Value) -> ProviderNode {
        let mut base = json!({
            "__typename": "IssueComment",
            "id": "IC_1",
            "createdAt": "2025-01-10T10:00:00Z",
            "actor": {"login": "alice"},
        });
        if let (Value::Object(base_map), Value::Object(extra_map)) = (&mut base, extra) {
            base_map.extend(extra_map);
        }
        base.as_object().cloned().unwrap()
    }

    #[test]
    fn lifts_actor_login_and_keeps_the_rest_as_payload() {
        let n = node(json!({"body": "hello"}));
        let event = normalize_node("github", "I_1", &n).unwrap();
        assert_eq!(event.actor.as_deref(), Some("alice"));
        assert_eq!(event.provider_event_id, "IC_1");
        assert_eq!(event.event_type, "IssueComment");
        assert_eq!(event.payload.get("body").and_then(Value::as_str), Some("hello"));
        assert!(!event.payload.contains_key("actor"));
        assert!(!event.payload.contains_key("__typename"));
    }

    #[test]
    fn falls_back_to_author_login_when_actor_is_absent() {
        let mut n = node(json!({}));
        n.remove("actor");
        n.insert("author".to_string(), json!({"login": "bob"}));
        let event = normalize_node("github", "I_1", &n).unwrap();
        assert_eq!(event.actor.as_deref(), Some("bob"));
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut n = node(json!({}));
        n.remove("id");
        assert!(normalize_node("github", "I_1", &n).is_err());
    }
}
