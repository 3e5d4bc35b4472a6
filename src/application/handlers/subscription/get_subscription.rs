//! GetSubscriptionHandler - Query handler for a caller's subscription.

use std::sync::Arc;

use crate::domain::foundation::{ProviderSubscriptionId, UserId};
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionRepository;

/// Query for one subscription by provider id.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
    pub provider_subscription_id: ProviderSubscriptionId,
}

pub struct GetSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl GetSubscriptionHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    /// Rows owned by other users are reported as not found.
    pub async fn handle(&self, query: GetSubscriptionQuery) -> Result<Subscription, SubscriptionError> {
        self.repository
            .find_by_provider_id(&query.provider_subscription_id)
            .await?
            .filter(|sub| sub.user_id == query.user_id)
            .ok_or_else(|| {
                SubscriptionError::subscription_not_found(query.provider_subscription_id.as_str())
            })
    }
}
