//! Provider fetch contract (spec.md §6.2) and a GitHub GraphQL client.
//!
//! Grounded on `examples/original_source/api/internal/providers/github`:
//! a REST-ish GraphQL POST client with a fixed request timeout, paging by
//! `(cursor, page_size)`, and a page shape of
//! `{issue_node_id, items[], end_cursor, has_next_page}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Map as JsonMap;
use serde_json::Value;

use trustflow_types::Scope;

use crate::error::IngestError;

/// One raw timeline node as returned by the provider, before normalization.
pub type ProviderNode = JsonMap<String, Value>;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPage {
    pub issue_node_id: Option<String>,
    pub items: Vec<ProviderNode>,
    pub end_cursor: String,
    pub has_next_page: bool,
}

/// A request that returns one page of events for `scope`, given a
/// resumption `cursor` and `page_size` (spec.md §6.2). Implementations
/// own their own request timeout.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn fetch_page(
        &self,
        token: &str,
        scope: &Scope,
        cursor: &str,
        page_size: u32,
    ) -> Result<ProviderPage, IngestError>;
}

/// Mints a short-lived provider access token for a scope (spec.md §6.2:
/// "provider auth is handled by a short-lived token minted from the
/// collaborator's credentials" — token *issuance* itself is the external
/// collaborator named in spec.md §1's non-goals, so this trait only fixes
/// the shape C5 depends on).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token_for(&self, scope: &Scope) -> Result<String, IngestError>;
}

/// Dev-mode token provider: returns a single statically configured token.
/// Stands in for the real installation-token minting collaborator, the
/// same way `trustflow-anchor`'s sinks stand in for a real CAS/ledger.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token_for(&self, _scope: &Scope) -> Result<String, IngestError> {
        Ok(self.token.clone())
    }
}

/// GraphQL client for the GitHub issue-timeline page query.
pub struct GithubGraphQlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GithubGraphQlClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Fetch(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Matches `github.NewGraphQLClient(12 * time.Second)`.
    pub fn with_default_timeout(endpoint: impl Into<String>) -> Result<Self, IngestError> {
        Self::new(endpoint, Duration::from_secs(12))
    }
}

#[derive(Debug, serde::Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: GraphQlVariables<'a>,
}

#[derive(Debug, serde::Serialize)]
struct GraphQlVariables<'a> {
    database_id: i64,
    cursor: Option<&'a str>,
    page_size: u32,
}

/// `issueByDatabaseId` matches the numeric id GitHub's webhook payload
/// carries (spec.md §3: `entity_key = "<provider>#<provider_numeric_id>"`),
/// sidestepping the need to also track owner/repo just to address the
/// issue node for pagination.
const ISSUE_TIMELINE_QUERY: &str = r#"
query($databaseId: Int!, $cursor: String, $pageSize: Int!) {
  issueByDatabaseId(id: $databaseId) {
    id
    timelineItems(first: $pageSize, after: $cursor) {
      pageInfo { endCursor hasNextPage }
      nodes { __typename ... on Node { id } }
    }
  }
}
"#;

#[async_trait]
impl ProviderClient for GithubGraphQlClient {
    async fn fetch_page(
        &self,
        token: &str,
        scope: &Scope,
        cursor: &str,
        page_size: u32,
    ) -> Result<ProviderPage, IngestError> {
        let database_id = provider_numeric_id(scope)?;
        let body = GraphQlRequest {
            query: ISSUE_TIMELINE_QUERY,
            variables: GraphQlVariables {
                database_id,
                cursor: if cursor.is_empty() { None } else { Some(cursor) },
                page_size,
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IngestError::Fetch(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(IngestError::Fetch(format!(
                "provider returned status {}",
                resp.status()
            )));
        }

        resp.json::<ProviderPage>()
            .await
            .map_err(|e| IngestError::Fetch(e.to_string()))
    }
}

/// Extracts the provider numeric id from `entity_key = "<provider>#<id>"`
/// (spec.md §3).
fn provider_numeric_id(scope: &Scope) -> Result<i64, IngestError> {
    scope
        .entity_key
        .rsplit_once('#')
        .map(|(_, id)| id)
        .unwrap_or(scope.entity_key.as_str())
        .parse::<i64>()
        .map_err(|e| IngestError::Fetch(format!("scope {scope} has no numeric provider id: {e}")))
}
