//! `Scope` — the partition key of the entire ledger (spec.md §3).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DataError;

/// A `(entity_kind, entity_key)` pair. Scope partitions the ledger; nothing
/// crosses scopes. For a code-host issue, `entity_kind == "issue"` and
/// `entity_key == "<provider>#<provider_numeric_id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub entity_kind: String,
    pub entity_key: String,
}

impl Scope {
    /// Builds a scope, rejecting empty components per spec.md §4.4 step 1
    /// ("fails with `BadRequest` if the scope identifier is absent").
    pub fn new(
        entity_kind: impl Into<String>,
        entity_key: impl Into<String>,
    ) -> Result<Self, DataError> {
        let entity_kind = entity_kind.into();
        let entity_key = entity_key.into();
        if entity_kind.trim().is_empty() || entity_key.trim().is_empty() {
            return Err(DataError::MissingScope);
        }
        Ok(Self {
            entity_kind,
            entity_key,
        })
    }

    /// Convenience constructor for a code-host issue scope:
    /// `entity_kind = "issue"`, `entity_key = "<provider>#<id>"`.
    pub fn issue(provider: &str, provider_numeric_id: i64) -> Result<Self, DataError> {
        Self::new("issue", format!("{provider}#{provider_numeric_id}"))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_kind, self.entity_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_components() {
        assert!(Scope::new("", "gh#7").is_err());
        assert!(Scope::new("issue", "").is_err());
    }

    #[test]
    fn issue_scope_format() {
        let s = Scope::issue("github", 42).unwrap();
        assert_eq!(s.entity_kind, "issue");
        assert_eq!(s.entity_key, "github#42");
    }
}
