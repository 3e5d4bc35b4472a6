//! WebhookVerifier - Proves an inbound webhook came from the billing provider.
//!
//! Fails closed: a missing header, a foreign certificate host, a malformed
//! body, a provider error or any verdict other than `SUCCESS` rejects the
//! delivery. Nothing is written before verification succeeds.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::value::RawValue;

use crate::domain::subscription::{
    CanonicalMessage, CertUrlPolicy, TransmissionHeaders, WebhookError,
};
use crate::ports::{BillingProvider, SignatureVerificationRequest, VerificationStatus};

/// Whether signatures are checked. Resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    Enforced,
    /// Local development only. Every bypassed delivery logs a warning.
    Bypassed,
}

impl VerificationMode {
    /// Production always enforces, whatever the configuration says.
    pub fn resolve(bypass_requested: bool, is_production: bool) -> Self {
        if bypass_requested && !is_production {
            tracing::warn!("Webhook signature verification is BYPASSED; never enable this outside local development");
            VerificationMode::Bypassed
        } else {
            VerificationMode::Enforced
        }
    }
}

/// A delivery that passed verification.
#[derive(Debug, Clone)]
pub struct VerifiedWebhook {
    /// Parsed JSON body.
    pub event: serde_json::Value,
    /// `None` when verification was bypassed and headers were not inspected.
    pub transmission_id: Option<String>,
}

pub struct WebhookVerifier {
    provider: Arc<dyn BillingProvider>,
    cert_policy: CertUrlPolicy,
    webhook_id: Option<String>,
    mode: VerificationMode,
}

impl WebhookVerifier {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        cert_policy: CertUrlPolicy,
        webhook_id: Option<String>,
        mode: VerificationMode,
    ) -> Self {
        Self {
            provider,
            cert_policy,
            webhook_id: webhook_id.filter(|id| !id.trim().is_empty()),
            mode,
        }
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// `true` only when the delivery is proven authentic.
    pub async fn is_authentic(&self, headers: &HeaderMap, raw_body: &[u8]) -> bool {
        self.verify(headers, raw_body).await.is_ok()
    }

    /// Verifies a delivery and returns its parsed body.
    ///
    /// # Errors
    ///
    /// - `MissingConfiguration` when the webhook id or credentials are absent
    /// - `MissingHeader` / `UntrustedCertUrl` from the local checks
    /// - `VerificationFailed` for malformed bodies, provider errors and non-success verdicts
    pub async fn verify(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<VerifiedWebhook, WebhookError> {
        if self.mode == VerificationMode::Bypassed {
            tracing::warn!("Accepting webhook without signature verification (bypass enabled)");
            return Ok(VerifiedWebhook {
                event: parse_body(raw_body)?,
                transmission_id: None,
            });
        }

        let webhook_id = self
            .webhook_id
            .as_deref()
            .ok_or(WebhookError::MissingConfiguration("billing.webhook_id"))?;
        if !self.provider.is_configured() {
            return Err(WebhookError::MissingConfiguration(
                "billing.client_id / billing.client_secret",
            ));
        }

        let transmission = TransmissionHeaders::from_headers(headers).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook with incomplete transmission headers");
            e
        })?;

        self.cert_policy.check(&transmission.cert_url).map_err(|e| {
            tracing::warn!(
                cert_url = %transmission.cert_url,
                transmission_id = %transmission.transmission_id,
                "Rejected webhook with untrusted certificate URL"
            );
            e
        })?;

        let event = parse_body(raw_body)?;
        let webhook_event = raw_event(raw_body)?;
        let canonical_message = CanonicalMessage::new(&transmission, webhook_id, raw_body);
        let transmission_id = transmission.transmission_id.clone();

        let request = SignatureVerificationRequest {
            headers: transmission,
            webhook_id: webhook_id.to_string(),
            canonical_message,
            webhook_event,
        };

        let verdict = self.provider.verify_webhook_signature(&request).await;
        match verdict {
            Ok(VerificationStatus::Success) => {
                tracing::debug!(transmission_id = %transmission_id, "Webhook signature verified");
                Ok(VerifiedWebhook {
                    event,
                    transmission_id: Some(transmission_id),
                })
            }
            Ok(VerificationStatus::Failure(status)) => {
                tracing::warn!(
                    transmission_id = %transmission_id,
                    verification_status = %status,
                    "Webhook signature rejected by provider"
                );
                Err(WebhookError::VerificationFailed(format!(
                    "verification_status {}",
                    status
                )))
            }
            Err(e) => {
                tracing::warn!(
                    transmission_id = %transmission_id,
                    error = %e,
                    "Webhook signature could not be verified"
                );
                Err(WebhookError::VerificationFailed(e.to_string()))
            }
        }
    }
}

fn parse_body(raw_body: &[u8]) -> Result<serde_json::Value, WebhookError> {
    serde_json::from_slice(raw_body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected webhook with malformed JSON body");
        WebhookError::VerificationFailed(format!("malformed body: {}", e))
    })
}

/// The delivered body as-is, for echoing to the provider.
fn raw_event(raw_body: &[u8]) -> Result<Box<RawValue>, WebhookError> {
    let text = std::str::from_utf8(raw_body)
        .map_err(|e| WebhookError::VerificationFailed(format!("malformed body: {}", e)))?;
    RawValue::from_string(text.to_owned())
        .map_err(|e| WebhookError::VerificationFailed(format!("malformed body: {}", e)))
}
