//! Minimal issues-event envelope (spec.md §6.6's "parse a minimal
//! envelope to extract provider identifiers").
//!
//! Grounded on `ledger/internal/github/parse.go`'s `ParseIssuesEvent`:
//! only `action`, `issue.id`, `issue.number`, `repository.name`, and
//! `repository.owner.login` are read; the rest of the payload is
//! forwarded untouched to C5's normalization step once the resource is
//! confirmed managed.

use serde::Deserialize;

use crate::error::WebError;

#[derive(Debug, Clone, Deserialize)]
struct Issue {
    id: i64,
    number: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Repository {
    name: String,
    owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    action: Option<String>,
    issue: Option<Issue>,
    repository: Option<Repository>,
}

/// The subset of an `issues` webhook payload C7 needs to decide whether
/// the resource is managed and, if so, what to enqueue.
#[derive(Debug, Clone)]
pub struct MinimalIssuesEvent {
    pub action: String,
    pub owner: String,
    pub repo: String,
    pub provider_numeric_id: i64,
    pub number: i64,
}

/// Parses an `issues` event body. Matches `ParseIssuesEvent`'s "missing
/// repo/owner/issue" rejection: every field below is required.
pub fn parse_issues_event(body: &[u8]) -> Result<MinimalIssuesEvent, WebError> {
    let env: Envelope =
        serde_json::from_slice(body).map_err(|e| WebError::MalformedEnvelope(e.to_string()))?;

    let issue = env
        .issue
        .ok_or_else(|| WebError::MalformedEnvelope("missing issue".to_string()))?;
    let repository = env
        .repository
        .ok_or_else(|| WebError::MalformedEnvelope("missing repository".to_string()))?;

    Ok(MinimalIssuesEvent {
        action: env.action.unwrap_or_default(),
        owner: repository.owner.login,
        repo: repository.name,
        provider_numeric_id: issue.id,
        number: issue.number,
    })
}
