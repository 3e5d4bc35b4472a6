//! Compensation port for orphaned provider subscriptions.
//!
//! When the internal write fails after the provider already created the
//! subscription, the provider side can only be undone by cancelling it.

use async_trait::async_trait;

use super::PaymentError;
use crate::domain::foundation::{ProviderSubscriptionId, UserId};

/// A cancellation request for a provider subscription with no internal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationRequest {
    pub user_id: UserId,
    pub provider_subscription_id: ProviderSubscriptionId,
    pub reason: String,
}

/// Issues one best-effort cancellation. Implementations never retry.
#[async_trait]
pub trait SubscriptionCompensator: Send + Sync {
    async fn cancel_orphaned(&self, request: &CompensationRequest) -> Result<(), PaymentError>;
}
