//! SubscriptionRollbackCoordinator - Best-effort cancellation of orphaned provider subscriptions.
//!
//! Exactly one attempt per call, bounded by a timeout. Failures are logged
//! at `error` and reported in the outcome; they are never retried and never
//! propagate to the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::ports::{CompensationRequest, SubscriptionCompensator};

/// Result of a compensation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    Compensated,
    Failed(String),
    TimedOut,
}

impl RollbackOutcome {
    pub fn is_compensated(&self) -> bool {
        matches!(self, RollbackOutcome::Compensated)
    }
}

pub struct SubscriptionRollbackCoordinator {
    compensator: Arc<dyn SubscriptionCompensator>,
    timeout: Duration,
}

impl SubscriptionRollbackCoordinator {
    pub fn new(compensator: Arc<dyn SubscriptionCompensator>, timeout: Duration) -> Self {
        Self {
            compensator,
            timeout,
        }
    }

    pub async fn compensate(&self, request: CompensationRequest) -> RollbackOutcome {
        tracing::info!(
            provider_subscription_id = %request.provider_subscription_id,
            user_id = %request.user_id,
            reason = %request.reason,
            "Compensating orphaned provider subscription"
        );

        match tokio::time::timeout(self.timeout, self.compensator.cancel_orphaned(&request)).await {
            Ok(Ok(())) => {
                tracing::info!(
                    provider_subscription_id = %request.provider_subscription_id,
                    "Orphaned provider subscription cancelled"
                );
                RollbackOutcome::Compensated
            }
            Ok(Err(e)) => {
                tracing::error!(
                    provider_subscription_id = %request.provider_subscription_id,
                    error = %e,
                    "Compensation failed; provider subscription left orphaned"
                );
                RollbackOutcome::Failed(e.to_string())
            }
            Err(_) => {
                tracing::error!(
                    provider_subscription_id = %request.provider_subscription_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Compensation timed out; provider subscription left orphaned"
                );
                RollbackOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::paypal::{CancelMode, MockBillingProvider};
    use crate::adapters::rollback::ProviderCompensator;
    use crate::domain::foundation::{ProviderSubscriptionId, UserId};
    use crate::ports::PaymentError;

    fn request() -> CompensationRequest {
        CompensationRequest {
            user_id: UserId::new("user-1").unwrap(),
            provider_subscription_id: ProviderSubscriptionId::new("I-MOCK-SUB-123").unwrap(),
            reason: "Database write failed".to_string(),
        }
    }

    fn coordinator(provider: &MockBillingProvider, timeout: Duration) -> SubscriptionRollbackCoordinator {
        SubscriptionRollbackCoordinator::new(
            Arc::new(ProviderCompensator::new(Arc::new(provider.clone()))),
            timeout,
        )
    }

    #[tokio::test]
    async fn successful_cancellation_is_compensated() {
        let provider = MockBillingProvider::new();

        let outcome = coordinator(&provider, Duration::from_secs(1)).compensate(request()).await;

        assert!(outcome.is_compensated());
        assert_eq!(provider.call_count("cancel_subscription"), 1);
    }

    #[tokio::test]
    async fn failure_is_reported_once_without_retry() {
        let provider = MockBillingProvider::new();
        provider.set_cancel_mode(CancelMode::Fail(PaymentError::network("connection reset")));

        let outcome = coordinator(&provider, Duration::from_secs(1)).compensate(request()).await;

        assert!(matches!(outcome, RollbackOutcome::Failed(_)));
        assert_eq!(provider.call_count("cancel_subscription"), 1);
    }

    #[tokio::test]
    async fn slow_compensation_times_out() {
        let provider = MockBillingProvider::new();
        provider.set_delay(Duration::from_millis(500));

        let outcome = coordinator(&provider, Duration::from_millis(20)).compensate(request()).await;

        assert_eq!(outcome, RollbackOutcome::TimedOut);
    }
}
