//! Subscription aggregate.

use serde::{Deserialize, Serialize};

use super::{StatusUpdate, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, ProviderPlanId, ProviderSubscriptionId, StateMachine, SubscriptionId,
    Timestamp, UserId, ValidationError,
};

/// Internal record of a provider-side recurring subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub provider_subscription_id: ProviderSubscriptionId,
    pub provider_plan_id: ProviderPlanId,
    pub status: SubscriptionStatus,
    pub start_date: Option<Timestamp>,
    pub next_billing_date: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of applying a keyed status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The row now carries the update's target status.
    Applied { previous: SubscriptionStatus },
    /// The row is terminal and the update targets a different status.
    SkippedTerminal { current: SubscriptionStatus },
    /// No row exists for the provider subscription id.
    NotFound,
}

impl Subscription {
    /// Creates a new subscription in `pending` or `active`.
    ///
    /// `start_date` is stamped when the row starts out active.
    pub fn create(
        user_id: UserId,
        provider_subscription_id: ProviderSubscriptionId,
        provider_plan_id: ProviderPlanId,
        initial_status: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if !initial_status.is_valid_initial() {
            return Err(ValidationError::invalid_format(
                "initial_status",
                format!("'{}' is not a valid initial status", initial_status),
            ));
        }

        Ok(Self {
            id: SubscriptionId::new(),
            user_id,
            provider_subscription_id,
            provider_plan_id,
            status: initial_status,
            start_date: (initial_status == SubscriptionStatus::Active).then_some(now),
            next_billing_date: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies a provider-driven status update.
    ///
    /// Terminal rows only accept re-delivery of their own status.
    pub fn apply(&mut self, update: &StatusUpdate, now: Timestamp) -> ApplyOutcome {
        if !self.status.can_transition_to(&update.status) {
            return ApplyOutcome::SkippedTerminal {
                current: self.status,
            };
        }

        let previous = self.status;
        self.status = update.status;
        self.start_date = update.start_date.resolve(self.start_date);
        self.next_billing_date = update.next_billing_date.resolve(self.next_billing_date);
        self.updated_at = now;
        ApplyOutcome::Applied { previous }
    }

    /// Cancels a pending, active or suspended subscription.
    ///
    /// # Errors
    ///
    /// `SubscriptionNotFound` when the row is already terminal, matching the
    /// "no active subscription" contract of `cancel_subscription_atomic`.
    pub fn cancel(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), DomainError> {
        if !self.status.is_cancellable() {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "No active subscription matches",
            )
            .with_detail("status", self.status.as_str()));
        }

        self.status = SubscriptionStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }
}
