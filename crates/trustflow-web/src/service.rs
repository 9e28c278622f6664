//! `WebhookService` — C7's verify/ACK/enqueue pipeline (spec.md §4.7).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use trustflow_ingest::WorkQueueHandle;
use trustflow_types::{RefreshInstruction, Scope};

use crate::checker::{is_managed, ExistsChecker};
use crate::envelope::parse_issues_event;
use crate::error::WebError;
use crate::signature::verify_github_signature;

/// Configuration specific to the webhook front door (spec.md §6.8 plus
/// SPEC_FULL.md §2.3's `exists_fail_open` knob).
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: Vec<u8>,
    /// When `true`, a failed `ExistsByProviderId` call is treated as
    /// "managed" instead of "unmanaged, drop" — an explicit opt-in,
    /// default `false` (spec.md §9 pins fail-closed as the reference
    /// design).
    pub exists_fail_open: bool,
}

pub struct WebhookService {
    config: WebhookConfig,
    checker: Arc<dyn ExistsChecker>,
    queue: WorkQueueHandle,
}

impl WebhookService {
    pub fn new(config: WebhookConfig, checker: Arc<dyn ExistsChecker>, queue: WorkQueueHandle) -> Self {
        Self {
            config,
            checker,
            queue,
        }
    }

    /// Step 2 of spec.md §4.7: verify the provider signature. Synchronous
    /// and fast — this is what the handler awaits before ACKing.
    pub fn verify(&self, body: &[u8], signature_header: &str) -> Result<(), WebError> {
        if verify_github_signature(&self.config.secret, body, signature_header) {
            Ok(())
        } else {
            Err(WebError::SignatureMismatch)
        }
    }

    /// Step 4 of spec.md §4.7: background classification, existence
    /// check, and enqueue. Runs after the handler has already ACKed, so
    /// errors here are logged and swallowed, never surfaced to the
    /// provider (spec.md §7: "C7 logs and ignores").
    pub async fn process(&self, body: &[u8], event_type: &str, delivery_id: &str) {
        if event_type != "issues" {
            info!(event_type, delivery_id, "dropping unsupported event type");
            return;
        }

        let parsed = match parse_issues_event(body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(delivery_id, error = %err, "dropping malformed issues event");
                return;
            }
        };

        info!(
            delivery_id,
            owner = %parsed.owner,
            repo = %parsed.repo,
            number = parsed.number,
            action = %parsed.action,
            "received webhook event"
        );

        let managed = is_managed(
            self.checker.as_ref(),
            parsed.provider_numeric_id,
            self.config.exists_fail_open,
        )
        .await;
        if !managed {
            info!(delivery_id, "ignored unmanaged issue");
            return;
        }

        let scope = match Scope::issue("github", parsed.provider_numeric_id) {
            Ok(scope) => scope,
            Err(err) => {
                warn!(delivery_id, error = %err, "could not build scope for managed issue");
                return;
            }
        };

        self.queue.try_enqueue(RefreshInstruction {
            scope,
            delivery_id: delivery_id.to_string(),
            received_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hmac::Mac;

    struct AlwaysManaged;

    #[async_trait]
    impl ExistsChecker for AlwaysManaged {
        async fn exists_by_provider_id(&self, _id: i64) -> Result<bool, WebError> {
            Ok(true)
        }
    }

    struct NeverManaged;

    #[async_trait]
    impl ExistsChecker for NeverManaged {
        async fn exists_by_provider_id(&self, _id: i64) -> Result<bool, WebError> {
            Ok(false)
        }
    }

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(secret).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn verify_rejects_a_bad_signature() {
        let (handle, _rx) = WorkQueueHandle::channel(8);
        let svc = WebhookService::new(
            WebhookConfig {
                secret: b"s3cr3t".to_vec(),
                exists_fail_open: false,
            },
            Arc::new(AlwaysManaged),
            handle,
        );
        assert!(matches!(
            svc.verify(b"body", "sha256=deadbeef"),
            Err(WebError::SignatureMismatch)
        ));
    }

    #[tokio::test]
    async fn process_enqueues_a_managed_issue_event() {
        let (handle, mut rx) = WorkQueueHandle::channel(8);
        let svc = WebhookService::new(
            WebhookConfig {
                secret: b"s3cr3t".to_vec(),
                exists_fail_open: false,
            },
            Arc::new(AlwaysManaged),
            handle,
        );
        let body = serde_json::json!({
            "action": "opened",
            "issue": {"id": 42, "number": 7},
            "repository": {"name": "widgets", "owner": {"login": "acme"}}
        })
        .to_string();

        svc.process(body.as_bytes(), "issues", "delivery-1").await;

        let instr = rx.try_recv().expect("instruction enqueued");
        assert_eq!(instr.scope.entity_key, "github#42");
        assert_eq!(instr.delivery_id, "delivery-1");
    }

    #[tokio::test]
    async fn process_drops_an_unmanaged_issue_silently() {
        let (handle, mut rx) = WorkQueueHandle::channel(8);
        let svc = WebhookService::new(
            WebhookConfig {
                secret: b"s3cr3t".to_vec(),
                exists_fail_open: false,
            },
            Arc::new(NeverManaged),
            handle,
        );
        let body = serde_json::json!({
            "action": "opened",
            "issue": {"id": 42, "number": 7},
            "repository": {"name": "widgets", "owner": {"login": "acme"}}
        })
        .to_string();

        svc.process(body.as_bytes(), "issues", "delivery-1").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn process_ignores_non_issue_events() {
        let (handle, mut rx) = WorkQueueHandle::channel(8);
        let svc = WebhookService::new(
            WebhookConfig {
                secret: b"s3cr3t".to_vec(),
                exists_fail_open: false,
            },
            Arc::new(AlwaysManaged),
            handle,
        );
        svc.process(b"{}", "star", "delivery-1").await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn signatures_round_trip_through_the_github_style_scheme() {
        let header = sign(b"s3cr3t", b"{}");
        assert!(header.starts_with("sha256="));
    }
}
