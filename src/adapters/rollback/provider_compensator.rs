//! Rollback by cancelling directly at the billing provider.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{BillingProvider, CompensationRequest, PaymentError, SubscriptionCompensator};

pub struct ProviderCompensator {
    provider: Arc<dyn BillingProvider>,
}

impl ProviderCompensator {
    pub fn new(provider: Arc<dyn BillingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SubscriptionCompensator for ProviderCompensator {
    async fn cancel_orphaned(&self, request: &CompensationRequest) -> Result<(), PaymentError> {
        // AlreadyInactive counts as compensated.
        self.provider
            .cancel_subscription(&request.provider_subscription_id, &request.reason)
            .await
            .map(|_| ())
    }
}
