//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    activate_subscription, cancel_subscription, get_subscription, handle_paypal_webhook,
    SubscriptionAppState,
};

/// Create the subscription API router.
///
/// # Routes (require `X-User-Id`)
/// - `POST /activate` - Record a provider-approved subscription
/// - `POST /cancel` - Cancel a subscription
/// - `GET /:provider_subscription_id` - Get the caller's subscription
pub fn subscription_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/activate", post(activate_subscription))
        .route("/cancel", post(cancel_subscription))
        .route("/:provider_subscription_id", get(get_subscription))
}

/// Create the billing provider webhook router.
///
/// Separate from the subscription routes because webhooks carry no user
/// identity; they are verified by signature instead.
///
/// # Routes
/// - `POST /paypal` - Handle billing provider webhooks
pub fn webhook_routes() -> Router<SubscriptionAppState> {
    Router::new().route("/paypal", post(handle_paypal_webhook))
}

/// Create the complete subscription module router, mounted under `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", subscription_router())
///     .with_state(state);
/// ```
pub fn subscription_router() -> Router<SubscriptionAppState> {
    Router::new()
        .nest("/subscription", subscription_routes())
        .nest("/webhooks", webhook_routes())
}
