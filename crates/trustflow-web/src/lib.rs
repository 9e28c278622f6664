//! Webhook Front Door (C7): verifies the provider signature, ACKs fast,
//! and enqueues a refresh instruction for a managed resource
//! (spec.md §4.7, §6.6).

mod checker;
mod envelope;
mod error;
mod handler;
mod service;
mod signature;

pub use checker::{is_managed, AlwaysManagedChecker, ExistsChecker};
pub use envelope::{parse_issues_event, MinimalIssuesEvent};
pub use error::WebError;
pub use handler::{router, run_server};
pub use service::{WebhookConfig, WebhookService};
pub use signature::verify_github_signature;
