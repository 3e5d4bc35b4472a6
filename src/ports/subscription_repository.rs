//! Subscription repository port.
//!
//! Every write is a single atomic operation on the store: creation is an
//! insert-if-absent keyed by `provider_subscription_id`, cancellation and
//! provider-driven updates are conditional updates on the same key. Callers
//! never check-then-act.

use async_trait::async_trait;

use crate::domain::foundation::{
    DomainError, ProviderPlanId, ProviderSubscriptionId, SubscriptionId, UserId,
};
use crate::domain::subscription::{ApplyOutcome, StatusUpdate, Subscription, SubscriptionStatus};

/// Input to `create_subscription_atomic`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub provider_subscription_id: ProviderSubscriptionId,
    pub provider_plan_id: ProviderPlanId,
    /// `Pending` or `Active`.
    pub initial_status: SubscriptionStatus,
}

/// Repository port for subscription persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Creates a subscription row if none exists for the provider id.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the provider id already has a row
    /// - `UserNotFound` if the user is unknown
    /// - `ValidationFailed` if the initial status is not pending/active
    /// - `DatabaseError` on persistence failure
    async fn create_subscription_atomic(
        &self,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, DomainError>;

    /// Cancels the user's pending, active or suspended subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if no such row matches both user and provider id
    /// - `DatabaseError` on persistence failure
    async fn cancel_subscription_atomic(
        &self,
        user_id: &UserId,
        provider_subscription_id: &ProviderSubscriptionId,
        reason: &str,
    ) -> Result<(), DomainError>;

    /// Applies a provider-driven update keyed by provider subscription id.
    ///
    /// Terminal rows only accept their own status; a missing row yields
    /// `ApplyOutcome::NotFound` rather than an error.
    async fn apply_status_update(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
        update: &StatusUpdate,
    ) -> Result<ApplyOutcome, DomainError>;

    /// Finds a subscription by provider id.
    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;
}
