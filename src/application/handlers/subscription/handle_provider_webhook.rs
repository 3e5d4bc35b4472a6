//! HandleProviderWebhookHandler - Verifies and applies a billing provider webhook.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Deserialize;

use crate::domain::foundation::ProviderSubscriptionId;
use crate::domain::subscription::{ProviderEventType, WebhookError};

use super::apply_subscription_event::{
    ApplySubscriptionEventCommand, ApplySubscriptionEventHandler, ApplySubscriptionEventResult,
};
use super::verify_webhook::WebhookVerifier;

/// Command to handle a webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleProviderWebhookCommand {
    pub headers: HeaderMap,
    /// Raw body, exactly as received. The signature covers these bytes.
    pub body: Vec<u8>,
}

/// Routing fields of a webhook body.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    resource: Option<WebhookResource>,
}

#[derive(Debug, Deserialize)]
struct WebhookResource {
    #[serde(default)]
    id: Option<String>,
}

/// Handler for inbound provider webhooks.
///
/// Verification always runs first; a delivery that fails it never reaches
/// the state machine.
pub struct HandleProviderWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    apply_handler: Arc<ApplySubscriptionEventHandler>,
}

impl HandleProviderWebhookHandler {
    pub fn new(
        verifier: Arc<WebhookVerifier>,
        apply_handler: Arc<ApplySubscriptionEventHandler>,
    ) -> Self {
        Self {
            verifier,
            apply_handler,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleProviderWebhookCommand,
    ) -> Result<ApplySubscriptionEventResult, WebhookError> {
        // 1. Prove the delivery came from the provider
        let verified = self.verifier.verify(&cmd.headers, &cmd.body).await?;

        // 2. Extract routing fields
        let envelope: WebhookEnvelope = serde_json::from_value(verified.event)
            .map_err(|_| WebhookError::MissingField("event_type"))?;

        let event_type = envelope
            .event_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProviderEventType::parse)
            .ok_or(WebhookError::MissingField("event_type"))?;

        let resource_id = envelope.resource.and_then(|r| r.id);

        // Acknowledged whatever the resource looks like; nothing is written.
        if !event_type.changes_status() {
            tracing::info!(
                event_id = envelope.id.as_deref().unwrap_or(""),
                event_type = %event_type,
                resource_id = resource_id.as_deref().unwrap_or(""),
                summary = envelope.summary.as_deref().unwrap_or(""),
                "Acknowledging webhook with no status effect"
            );
            return Ok(if event_type.is_known() {
                ApplySubscriptionEventResult::Informational
            } else {
                ApplySubscriptionEventResult::Ignored
            });
        }

        let provider_subscription_id = resource_id
            .and_then(|id| ProviderSubscriptionId::new(id).ok())
            .ok_or(WebhookError::MissingField("resource.id"))?;

        tracing::info!(
            event_id = envelope.id.as_deref().unwrap_or(""),
            event_type = %event_type,
            provider_subscription_id = %provider_subscription_id,
            "Processing billing provider webhook"
        );

        // 3. Apply the keyed transition
        let result = self
            .apply_handler
            .handle(ApplySubscriptionEventCommand {
                event_type,
                provider_subscription_id,
                summary: envelope.summary,
            })
            .await?;

        Ok(result)
    }
}
