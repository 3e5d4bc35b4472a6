//! HTTP adapter for subscription endpoints.
//!
//! Exposes the subscription domain via REST API:
//! - `POST /api/webhooks/paypal` - Billing provider webhooks (signature verified)
//! - `POST /api/subscription/activate` - Record a provider-approved subscription
//! - `POST /api/subscription/cancel` - Cancel a subscription
//! - `GET /api/subscription/:provider_subscription_id` - Get the caller's subscription

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, SubscriptionApiError, SubscriptionAppState};
pub use routes::{subscription_router, subscription_routes, webhook_routes};
