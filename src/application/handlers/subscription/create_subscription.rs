//! CreateSubscriptionHandler - Records a provider-approved subscription.
//!
//! The client has already approved the subscription with the provider, so
//! the provider side exists before this handler runs. The flow is a two-step
//! saga:
//!
//! 1. Atomic insert-if-absent of the internal row
//! 2. On failure, cancel the provider subscription so it is not left orphaned
//!
//! A `Conflict` is the one failure that is not compensated: the provider
//! subscription is already tracked by the existing row.

use std::sync::Arc;

use crate::domain::foundation::{ProviderPlanId, ProviderSubscriptionId, SubscriptionId, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionStatus};
use crate::ports::{CompensationRequest, NewSubscription, SubscriptionRepository};

use super::rollback_subscription::{RollbackOutcome, SubscriptionRollbackCoordinator};

/// Command to record a newly approved subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub user_id: UserId,
    pub provider_subscription_id: ProviderSubscriptionId,
    pub provider_plan_id: ProviderPlanId,
    /// Defaults to `Active`.
    pub initial_status: Option<SubscriptionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubscriptionResult {
    pub subscription_id: SubscriptionId,
}

pub struct CreateSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    rollback: Arc<SubscriptionRollbackCoordinator>,
}

impl CreateSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        rollback: Arc<SubscriptionRollbackCoordinator>,
    ) -> Self {
        Self {
            repository,
            rollback,
        }
    }

    /// # Errors
    ///
    /// - `Conflict` if the provider id is already recorded (no compensation)
    /// - `UserNotFound`, `ValidationFailed` or `Infrastructure` after compensation ran
    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, SubscriptionError> {
        let new_subscription = NewSubscription {
            user_id: cmd.user_id,
            provider_subscription_id: cmd.provider_subscription_id,
            provider_plan_id: cmd.provider_plan_id,
            initial_status: cmd.initial_status.unwrap_or(SubscriptionStatus::Active),
        };

        match self
            .repository
            .create_subscription_atomic(&new_subscription)
            .await
        {
            Ok(subscription_id) => {
                tracing::info!(
                    subscription_id = %subscription_id,
                    provider_subscription_id = %new_subscription.provider_subscription_id,
                    user_id = %new_subscription.user_id,
                    status = %new_subscription.initial_status,
                    "Subscription recorded"
                );
                Ok(CreateSubscriptionResult { subscription_id })
            }
            Err(e) => {
                let err = SubscriptionError::from(e);

                if !err.requires_compensation() {
                    tracing::warn!(
                        provider_subscription_id = %new_subscription.provider_subscription_id,
                        "Subscription already recorded; not compensating"
                    );
                    return Err(err);
                }

                tracing::error!(
                    provider_subscription_id = %new_subscription.provider_subscription_id,
                    user_id = %new_subscription.user_id,
                    error = %err,
                    "Subscription write failed after provider approval"
                );

                let outcome = self
                    .rollback
                    .compensate(CompensationRequest {
                        user_id: new_subscription.user_id.clone(),
                        provider_subscription_id: new_subscription.provider_subscription_id.clone(),
                        reason: format!("Internal record could not be created: {}", err.code()),
                    })
                    .await;

                if outcome != RollbackOutcome::Compensated {
                    tracing::error!(
                        provider_subscription_id = %new_subscription.provider_subscription_id,
                        outcome = ?outcome,
                        "Orphaned provider subscription requires manual cancellation"
                    );
                }

                Err(err)
            }
        }
    }
}
