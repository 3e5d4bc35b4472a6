//! ApplySubscriptionEventHandler - Applies a verified provider event to the stored row.

use std::sync::Arc;

use crate::domain::foundation::{Clock, ProviderSubscriptionId};
use crate::domain::subscription::{
    ApplyOutcome, EventEffect, ProviderEventType, SubscriptionError, SubscriptionStatus,
};
use crate::ports::SubscriptionRepository;

/// Command to apply one provider event.
#[derive(Debug, Clone)]
pub struct ApplySubscriptionEventCommand {
    pub event_type: ProviderEventType,
    pub provider_subscription_id: ProviderSubscriptionId,
    /// Event summary, logged only.
    pub summary: Option<String>,
}

/// What happened to the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplySubscriptionEventResult {
    /// Row now carries `status`.
    Applied {
        previous: SubscriptionStatus,
        status: SubscriptionStatus,
    },
    /// Row is terminal; the event was acknowledged without a write.
    SkippedTerminal { current: SubscriptionStatus },
    /// Recognised event with nothing to store.
    Informational,
    /// Unrecognised event type.
    Ignored,
}

/// Handler for provider-driven status transitions.
///
/// Each event becomes one keyed conditional update, so re-delivery of the
/// same event leaves the row as a single delivery would.
pub struct ApplySubscriptionEventHandler {
    repository: Arc<dyn SubscriptionRepository>,
    clock: Arc<dyn Clock>,
}

impl ApplySubscriptionEventHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// # Errors
    ///
    /// - `SubscriptionNotFound` when no row exists yet for the id
    /// - `Infrastructure` when the write fails
    pub async fn handle(
        &self,
        cmd: ApplySubscriptionEventCommand,
    ) -> Result<ApplySubscriptionEventResult, SubscriptionError> {
        let update = match EventEffect::for_event(&cmd.event_type, self.clock.now()) {
            EventEffect::Update(update) => update,
            EventEffect::Informational => {
                tracing::info!(
                    event_type = %cmd.event_type,
                    provider_subscription_id = %cmd.provider_subscription_id,
                    summary = cmd.summary.as_deref().unwrap_or(""),
                    "Informational subscription event; no change"
                );
                return Ok(ApplySubscriptionEventResult::Informational);
            }
            EventEffect::Ignored => {
                tracing::info!(
                    event_type = %cmd.event_type,
                    provider_subscription_id = %cmd.provider_subscription_id,
                    "Ignoring unhandled webhook event type"
                );
                return Ok(ApplySubscriptionEventResult::Ignored);
            }
        };

        let outcome = self
            .repository
            .apply_status_update(&cmd.provider_subscription_id, &update)
            .await?;

        match outcome {
            ApplyOutcome::Applied { previous } => {
                tracing::info!(
                    event_type = %cmd.event_type,
                    provider_subscription_id = %cmd.provider_subscription_id,
                    previous_status = %previous,
                    status = %update.status,
                    "Subscription status updated"
                );
                Ok(ApplySubscriptionEventResult::Applied {
                    previous,
                    status: update.status,
                })
            }
            ApplyOutcome::SkippedTerminal { current } => {
                tracing::warn!(
                    event_type = %cmd.event_type,
                    provider_subscription_id = %cmd.provider_subscription_id,
                    status = %current,
                    target_status = %update.status,
                    "Event targets a terminal subscription; skipped"
                );
                Ok(ApplySubscriptionEventResult::SkippedTerminal { current })
            }
            ApplyOutcome::NotFound => {
                tracing::warn!(
                    event_type = %cmd.event_type,
                    provider_subscription_id = %cmd.provider_subscription_id,
                    "No subscription row for event yet"
                );
                Err(SubscriptionError::subscription_not_found(
                    cmd.provider_subscription_id.as_str(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::domain::foundation::{ManualClock, Timestamp, UserId};
    use crate::domain::subscription::Subscription;
    use crate::domain::foundation::ProviderPlanId;
    use SubscriptionStatus::*;

    struct Fixture {
        repo: Arc<InMemorySubscriptionRepository>,
        clock: Arc<ManualClock>,
        handler: ApplySubscriptionEventHandler,
    }

    fn fixture_with(status: SubscriptionStatus) -> Fixture {
        let clock = Arc::new(ManualClock::new(Timestamp::now()));
        let repo = Arc::new(InMemorySubscriptionRepository::with_clock(clock.clone()));
        let mut sub = Subscription::create(
            UserId::new("user-1").unwrap(),
            ProviderSubscriptionId::new("I-ABC").unwrap(),
            ProviderPlanId::new("P-MONTHLY").unwrap(),
            Pending,
            clock.now(),
        )
        .unwrap();
        sub.status = status;
        repo.insert(sub);

        let handler = ApplySubscriptionEventHandler::new(repo.clone(), clock.clone());
        Fixture { repo, clock, handler }
    }

    fn cmd(event: &str, psid: &str) -> ApplySubscriptionEventCommand {
        ApplySubscriptionEventCommand {
            event_type: ProviderEventType::parse(event),
            provider_subscription_id: ProviderSubscriptionId::new(psid).unwrap(),
            summary: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transitions
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn activated_moves_pending_to_active() {
        let f = fixture_with(Pending);

        let result = f
            .handler
            .handle(cmd("BILLING.SUBSCRIPTION.ACTIVATED", "I-ABC"))
            .await
            .unwrap();

        assert_eq!(result, ApplySubscriptionEventResult::Applied { previous: Pending, status: Active });
        assert_eq!(f.repo.get("I-ABC").unwrap().status, Active);
    }

    #[tokio::test]
    async fn each_event_maps_to_documented_status() {
        for (event, expected) in [
            ("BILLING.SUBSCRIPTION.CREATED", Active),
            ("BILLING.SUBSCRIPTION.ACTIVATED", Active),
            ("BILLING.SUBSCRIPTION.CANCELLED", Cancelled),
            ("BILLING.SUBSCRIPTION.SUSPENDED", Suspended),
            ("BILLING.SUBSCRIPTION.EXPIRED", Expired),
            ("PAYMENT.SALE.COMPLETED", Active),
        ] {
            let f = fixture_with(Active);
            f.handler.handle(cmd(event, "I-ABC")).await.unwrap();
            assert_eq!(f.repo.get("I-ABC").unwrap().status, expected, "{}", event);
        }
    }

    #[tokio::test]
    async fn created_sets_start_date_only_once() {
        let f = fixture_with(Pending);
        let first_now = f.clock.now();

        f.handler.handle(cmd("BILLING.SUBSCRIPTION.CREATED", "I-ABC")).await.unwrap();
        f.clock.advance(chrono::Duration::hours(1));
        f.handler.handle(cmd("BILLING.SUBSCRIPTION.CREATED", "I-ABC")).await.unwrap();

        assert_eq!(f.repo.get("I-ABC").unwrap().start_date, Some(first_now));
    }

    #[tokio::test]
    async fn payment_completed_sets_next_billing_one_month_out() {
        let f = fixture_with(Active);
        let now = f.clock.now();

        f.handler.handle(cmd("PAYMENT.SALE.COMPLETED", "I-ABC")).await.unwrap();

        let row = f.repo.get("I-ABC").unwrap();
        assert_eq!(row.next_billing_date, Some(now.add_months(1)));
        assert_eq!(row.start_date, None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency and guards
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn same_event_twice_yields_same_state() {
        let f = fixture_with(Pending);

        f.handler.handle(cmd("BILLING.SUBSCRIPTION.ACTIVATED", "I-ABC")).await.unwrap();
        let once = f.repo.get("I-ABC").unwrap();
        let second = f.handler.handle(cmd("BILLING.SUBSCRIPTION.ACTIVATED", "I-ABC")).await;
        let twice = f.repo.get("I-ABC").unwrap();

        assert!(second.is_ok());
        assert_eq!(once.status, twice.status);
        assert_eq!(once.start_date, twice.start_date);
        assert_eq!(once.next_billing_date, twice.next_billing_date);
    }

    #[tokio::test]
    async fn terminal_row_is_not_reactivated() {
        let f = fixture_with(Cancelled);

        let result = f
            .handler
            .handle(cmd("BILLING.SUBSCRIPTION.ACTIVATED", "I-ABC"))
            .await
            .unwrap();

        assert_eq!(result, ApplySubscriptionEventResult::SkippedTerminal { current: Cancelled });
        assert_eq!(f.repo.get("I-ABC").unwrap().status, Cancelled);
    }

    #[tokio::test]
    async fn terminal_row_accepts_its_own_status_again() {
        let f = fixture_with(Expired);

        let result = f
            .handler
            .handle(cmd("BILLING.SUBSCRIPTION.EXPIRED", "I-ABC"))
            .await
            .unwrap();

        assert!(matches!(result, ApplySubscriptionEventResult::Applied { status: Expired, .. }));
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let f = fixture_with(Active);

        let err = f
            .handler
            .handle(cmd("BILLING.SUBSCRIPTION.ACTIVATED", "I-UNKNOWN"))
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::SubscriptionNotFound(ref id) if id == "I-UNKNOWN"));
    }

    #[tokio::test]
    async fn updated_and_unknown_events_write_nothing() {
        let f = fixture_with(Pending);
        let before = f.repo.get("I-ABC").unwrap();

        let informational = f.handler.handle(cmd("BILLING.SUBSCRIPTION.UPDATED", "I-ABC")).await.unwrap();
        let ignored = f.handler.handle(cmd("CUSTOMER.DISPUTE.CREATED", "I-ABC")).await.unwrap();

        assert_eq!(informational, ApplySubscriptionEventResult::Informational);
        assert_eq!(ignored, ApplySubscriptionEventResult::Ignored);
        assert_eq!(f.repo.get("I-ABC").unwrap(), before);
    }

    #[tokio::test]
    async fn write_failure_is_infrastructure_error() {
        let f = fixture_with(Active);
        f.repo.set_fail_writes(true);

        let err = f
            .handler
            .handle(cmd("BILLING.SUBSCRIPTION.SUSPENDED", "I-ABC"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }
}
