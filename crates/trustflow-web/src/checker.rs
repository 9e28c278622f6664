//! The CRUD collaborator's existence check (spec.md §6.3), consumed by
//! C7 to decide whether an incoming event is for a *managed* resource.
//!
//! Grounded on `dataserver/checker.go`: an RPC call with a short timeout,
//! fail-closed by default. The original also has a fail-open branch for
//! when no client is configured (`if c.cli == nil { return true, nil }`);
//! SPEC_FULL.md §2.3 makes that an explicit `exists_fail_open` config
//! knob instead of an accidental nil-check code path.

use async_trait::async_trait;

use crate::error::WebError;

#[async_trait]
pub trait ExistsChecker: Send + Sync {
    /// `ExistsByProviderId` (spec.md §6.3). A timeout or transport error
    /// should be surfaced as `Err`, not silently mapped to `false` — the
    /// fail-closed/fail-open decision belongs to the caller
    /// (`WebhookService`), not the checker.
    async fn exists_by_provider_id(&self, provider_numeric_id: i64) -> Result<bool, WebError>;
}

/// Resolves an `ExistsChecker` result into a managed/unmanaged decision
/// under the configured fail policy. Fail-closed (the default) treats a
/// checker error as "unmanaged, drop silently" per spec.md §9; fail-open
/// treats it as "managed, keep processing" — an explicit opt-in knob,
/// never the default.
pub async fn is_managed(
    checker: &dyn ExistsChecker,
    provider_numeric_id: i64,
    fail_open: bool,
) -> bool {
    match checker.exists_by_provider_id(provider_numeric_id).await {
        Ok(managed) => managed,
        Err(_) if fail_open => true,
        Err(_) => false,
    }
}

/// Dev-mode checker that treats every resource as managed. Stands in for
/// the real CRUD collaborator the same way `StaticTokenProvider` stands
/// in for real token minting.
pub struct AlwaysManagedChecker;

#[async_trait]
impl ExistsChecker for AlwaysManagedChecker {
    async fn exists_by_provider_id(&self, _provider_numeric_id: i64) -> Result<bool, WebError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingChecker;

    #[async_trait]
    impl ExistsChecker for FailingChecker {
        async fn exists_by_provider_id(&self, _id: i64) -> Result<bool, WebError> {
            Err(WebError::ExistsCheck("timeout".to_string()))
        }
    }

    #[tokio::test]
    async fn fail_closed_treats_a_checker_error_as_unmanaged() {
        assert!(!is_managed(&FailingChecker, 1, false).await);
    }

    #[tokio::test]
    async fn fail_open_treats_a_checker_error_as_managed() {
        assert!(is_managed(&FailingChecker, 1, true).await);
    }
}
