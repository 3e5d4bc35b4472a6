//! CancelSubscriptionHandler - Cancels a subscription at the provider and locally.
//!
//! Also the target of the HTTP rollback client, so it must work when no
//! local row exists: the provider side is cancelled regardless and
//! `local_record` reports whether a row was updated.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, ProviderSubscriptionId, UserId};
use crate::domain::subscription::SubscriptionError;
use crate::ports::{BillingProvider, CancellationOutcome, SubscriptionRepository};

const DEFAULT_REASON: &str = "Cancelled by user";

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    pub provider_subscription_id: ProviderSubscriptionId,
    pub reason: Option<String>,
}

/// Result of a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSubscriptionResult {
    pub provider_outcome: CancellationOutcome,
    /// Whether a local row moved to `cancelled`.
    pub local_record: bool,
}

pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    provider: Arc<dyn BillingProvider>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        provider: Arc<dyn BillingProvider>,
    ) -> Self {
        Self {
            repository,
            provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, SubscriptionError> {
        let psid = &cmd.provider_subscription_id;
        let reason = cmd
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON);

        // 1. Another user's row is indistinguishable from no row
        let existing = self.repository.find_by_provider_id(psid).await?;
        if let Some(row) = &existing {
            if row.user_id != cmd.user_id {
                tracing::warn!(
                    provider_subscription_id = %psid,
                    user_id = %cmd.user_id,
                    "Cancellation requested for another user's subscription"
                );
                return Err(SubscriptionError::subscription_not_found(psid.as_str()));
            }
        }

        if !self.provider.is_configured() {
            return Err(SubscriptionError::configuration("billing client credentials"));
        }

        // 2. Provider side (idempotent)
        let provider_outcome = self.provider.cancel_subscription(psid, reason).await?;

        // 3. Local side, only for a non-terminal row
        let local_record = match existing {
            Some(row) if row.status.is_cancellable() => {
                match self
                    .repository
                    .cancel_subscription_atomic(&cmd.user_id, psid, reason)
                    .await
                {
                    Ok(()) => true,
                    // Reached a terminal state since the lookup.
                    Err(e) if e.code == ErrorCode::SubscriptionNotFound => false,
                    Err(e) => return Err(e.into()),
                }
            }
            _ => false,
        };

        tracing::info!(
            provider_subscription_id = %psid,
            user_id = %cmd.user_id,
            provider_outcome = ?provider_outcome,
            local_record,
            "Subscription cancelled"
        );

        Ok(CancelSubscriptionResult {
            provider_outcome,
            local_record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::paypal::{CancelMode, MockBillingProvider};
    use crate::domain::foundation::{ProviderPlanId, Timestamp};
    use crate::domain::subscription::{Subscription, SubscriptionStatus};
    use crate::ports::PaymentError;

    fn setup(status: Option<SubscriptionStatus>) -> (Arc<InMemorySubscriptionRepository>, MockBillingProvider, CancelSubscriptionHandler) {
        let repo = Arc::new(InMemorySubscriptionRepository::new().with_user("user-1"));
        if let Some(status) = status {
            let mut sub = Subscription::create(
                UserId::new("user-1").unwrap(),
                ProviderSubscriptionId::new("I-ABC").unwrap(),
                ProviderPlanId::new("P-1").unwrap(),
                SubscriptionStatus::Active,
                Timestamp::now(),
            )
            .unwrap();
            sub.status = status;
            repo.insert(sub);
        }
        let provider = MockBillingProvider::new();
        let handler = CancelSubscriptionHandler::new(repo.clone(), Arc::new(provider.clone()));
        (repo, provider, handler)
    }

    fn cmd(user: &str) -> CancelSubscriptionCommand {
        CancelSubscriptionCommand {
            user_id: UserId::new(user).unwrap(),
            provider_subscription_id: ProviderSubscriptionId::new("I-ABC").unwrap(),
            reason: Some("Too expensive".to_string()),
        }
    }

    #[tokio::test]
    async fn cancels_provider_and_local_row() {
        let (repo, provider, handler) = setup(Some(SubscriptionStatus::Active));

        let result = handler.handle(cmd("user-1")).await.unwrap();

        assert!(result.local_record);
        assert_eq!(provider.call_count("cancel_subscription"), 1);
        let row = repo.get("I-ABC").unwrap();
        assert_eq!(row.status, SubscriptionStatus::Cancelled);
        assert_eq!(row.cancellation_reason.as_deref(), Some("Too expensive"));
    }

    #[tokio::test]
    async fn other_users_row_is_not_found_without_provider_call() {
        let (repo, provider, handler) = setup(Some(SubscriptionStatus::Active));

        let err = handler.handle(cmd("user-2")).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::SubscriptionNotFound(_)));
        assert!(!provider.was_called("cancel_subscription"));
        assert_eq!(repo.get("I-ABC").unwrap().status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn orphaned_provider_subscription_is_cancelled_without_local_row() {
        let (_, provider, handler) = setup(None);

        let result = handler.handle(cmd("user-1")).await.unwrap();

        assert!(!result.local_record);
        assert_eq!(provider.call_count("cancel_subscription"), 1);
    }

    #[tokio::test]
    async fn terminal_row_is_left_alone() {
        let (repo, provider, handler) = setup(Some(SubscriptionStatus::Expired));
        provider.set_cancel_mode(CancelMode::AlreadyInactive);

        let result = handler.handle(cmd("user-1")).await.unwrap();

        assert_eq!(result.provider_outcome, CancellationOutcome::AlreadyInactive);
        assert!(!result.local_record);
        assert_eq!(repo.get("I-ABC").unwrap().status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn provider_failure_leaves_local_row_active() {
        let (repo, provider, handler) = setup(Some(SubscriptionStatus::Active));
        provider.set_cancel_mode(CancelMode::Fail(PaymentError::network("reset")));

        let err = handler.handle(cmd("user-1")).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::TransientNetwork(_)));
        assert_eq!(repo.get("I-ABC").unwrap().status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn blank_reason_uses_default() {
        let (repo, _, handler) = setup(Some(SubscriptionStatus::Suspended));
        let mut command = cmd("user-1");
        command.reason = Some("   ".to_string());

        handler.handle(command).await.unwrap();

        assert_eq!(
            repo.get("I-ABC").unwrap().cancellation_reason.as_deref(),
            Some(DEFAULT_REASON)
        );
    }
}
