//! HTTP DTOs for subscription endpoints.
//!
//! These types define the JSON request/response structure for the subscription API.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::{Subscription, SubscriptionStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to record a subscription the client approved with the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivateSubscriptionRequest {
    pub provider_subscription_id: String,
    pub provider_plan_id: String,
    /// `pending` or `active`; defaults to `active`.
    #[serde(default)]
    pub initial_status: Option<SubscriptionStatus>,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub provider_subscription_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the billing provider.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateSubscriptionResponse {
    pub subscription_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionResponse {
    pub cancelled: bool,
    /// Whether an internal row was moved to `cancelled`.
    pub local_record: bool,
}

/// Subscription view for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub provider_subscription_id: String,
    pub provider_plan_id: String,
    pub status: SubscriptionStatus,
    /// ISO 8601.
    pub start_date: Option<String>,
    pub next_billing_date: Option<String>,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            provider_subscription_id: sub.provider_subscription_id.to_string(),
            provider_plan_id: sub.provider_plan_id.to_string(),
            status: sub.status,
            start_date: sub.start_date.map(|t| t.as_datetime().to_rfc3339()),
            next_billing_date: sub.next_billing_date.map(|t| t.as_datetime().to_rfc3339()),
            cancelled_at: sub.cancelled_at.map(|t| t.as_datetime().to_rfc3339()),
            cancellation_reason: sub.cancellation_reason,
            created_at: sub.created_at.as_datetime().to_rfc3339(),
            updated_at: sub.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
