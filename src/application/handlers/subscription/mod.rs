//! Subscription handlers.
//!
//! ## Commands
//! - Recording a provider-approved subscription (with compensation on failure)
//! - Cancelling a subscription
//! - Processing provider webhooks
//!
//! ## Queries
//! - Get a subscription by provider id
//!
//! ## Services
//! - `WebhookVerifier` - Webhook authenticity
//! - `SubscriptionRollbackCoordinator` - Best-effort compensation

mod apply_subscription_event;
mod cancel_subscription;
mod create_subscription;
mod get_subscription;
mod handle_provider_webhook;
mod rollback_subscription;
mod verify_webhook;

// Commands
pub use apply_subscription_event::{
    ApplySubscriptionEventCommand, ApplySubscriptionEventHandler, ApplySubscriptionEventResult,
};
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use create_subscription::{
    CreateSubscriptionCommand, CreateSubscriptionHandler, CreateSubscriptionResult,
};
pub use handle_provider_webhook::{HandleProviderWebhookCommand, HandleProviderWebhookHandler};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};

// Services
pub use rollback_subscription::{RollbackOutcome, SubscriptionRollbackCoordinator};
pub use verify_webhook::{VerificationMode, VerifiedWebhook, WebhookVerifier};
