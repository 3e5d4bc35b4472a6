//! REST adapter implementing `BillingProvider`.
//!
//! Every call fetches a bearer token from the shared cache first. A 401 from
//! the API means the cached token went stale early, so the cache is cleared
//! before the error is returned.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::adapters::transport_error;
use crate::config::BillingConfig;
use crate::domain::foundation::{Clock, ProviderSubscriptionId};
use crate::ports::{
    AccessTokenProvider, BillingProvider, CancellationOutcome, PaymentError, PaymentErrorCode,
    SignatureVerificationRequest, VerificationStatus,
};

use super::oauth_client::PayPalOAuthClient;
use super::token_cache::AccessTokenCache;
use super::wire_types::{
    ApiErrorResponse, CancelSubscriptionRequest, VerifySignatureRequest, VerifySignatureResponse,
};

/// Longest cancellation reason the provider accepts.
const MAX_REASON_CHARS: usize = 128;

/// Billing provider adapter.
pub struct PayPalBillingAdapter {
    http_client: reqwest::Client,
    api_base_url: String,
    /// `None` when client credentials are not configured.
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl PayPalBillingAdapter {
    pub fn new(
        http_client: reqwest::Client,
        api_base_url: impl Into<String>,
        tokens: Option<Arc<dyn AccessTokenProvider>>,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Builds the adapter, its OAuth client and token cache from configuration.
    pub fn from_config(config: &BillingConfig, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let tokens = config.credentials().map(|(client_id, client_secret)| {
            let issuer = PayPalOAuthClient::new(
                http_client.clone(),
                config.api_base_url.clone(),
                client_id,
                SecretString::new(client_secret.expose_secret().clone()),
            );
            Arc::new(AccessTokenCache::new(
                Arc::new(issuer),
                clock,
                config.token_safety_margin(),
            )) as Arc<dyn AccessTokenProvider>
        });

        if tokens.is_none() {
            tracing::warn!("Billing provider client credentials not configured");
        }

        Ok(Self::new(http_client, config.api_base_url.clone(), tokens))
    }

    async fn bearer_token(&self) -> Result<(SecretString, &Arc<dyn AccessTokenProvider>), PaymentError> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| PaymentError::not_configured("Billing provider client credentials"))?;
        Ok((tokens.access_token().await?, tokens))
    }

    /// Maps a non-success reply to a `PaymentError`.
    async fn error_from_response(
        &self,
        response: reqwest::Response,
        tokens: &Arc<dyn AccessTokenProvider>,
        operation: &str,
    ) -> PaymentError {
        let status = response.status();
        let body: ApiErrorResponse = response.json().await.unwrap_or_default();
        let detail = body.message.clone().unwrap_or_else(|| status.to_string());

        tracing::error!(
            operation,
            status = %status,
            error = %detail,
            debug_id = body.debug_id.as_deref().unwrap_or(""),
            "Billing provider call failed"
        );

        let err = match status {
            reqwest::StatusCode::UNAUTHORIZED => {
                tokens.invalidate().await;
                PaymentError::authentication(format!("Access token rejected: {}", detail))
            }
            reqwest::StatusCode::NOT_FOUND => PaymentError::new(PaymentErrorCode::NotFound, detail),
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                PaymentError::new(PaymentErrorCode::RateLimitExceeded, detail)
            }
            _ => PaymentError::provider(format!("{} failed: {}", operation, detail)),
        };

        match body.name {
            Some(name) => err.with_provider_code(name),
            None => err,
        }
    }
}

fn truncate_reason(reason: &str) -> String {
    reason.chars().take(MAX_REASON_CHARS).collect()
}

#[async_trait]
impl BillingProvider for PayPalBillingAdapter {
    async fn verify_webhook_signature(
        &self,
        request: &SignatureVerificationRequest,
    ) -> Result<VerificationStatus, PaymentError> {
        let (token, tokens) = self.bearer_token().await?;
        let url = format!("{}/v1/notifications/verify-webhook-signature", self.api_base_url);

        tracing::debug!(
            transmission_id = %request.headers.transmission_id,
            canonical_message = %request.canonical_message.as_str(),
            "Submitting webhook signature for verification"
        );

        let body = VerifySignatureRequest {
            auth_algo: &request.headers.auth_algo,
            cert_url: &request.headers.cert_url,
            transmission_id: &request.headers.transmission_id,
            transmission_sig: &request.headers.transmission_sig,
            transmission_time: &request.headers.transmission_time,
            webhook_id: &request.webhook_id,
            webhook_event: &request.webhook_event,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(self
                .error_from_response(response, tokens, "verify_webhook_signature")
                .await);
        }

        let verdict: VerifySignatureResponse = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse verification response: {}", e))
        })?;

        Ok(VerificationStatus::from_provider(&verdict.verification_status))
    }

    async fn cancel_subscription(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
        reason: &str,
    ) -> Result<CancellationOutcome, PaymentError> {
        let (token, tokens) = self.bearer_token().await?;
        let url = format!(
            "{}/v1/billing/subscriptions/{}/cancel",
            self.api_base_url,
            provider_subscription_id.as_str()
        );
        let reason = truncate_reason(reason);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&CancelSubscriptionRequest { reason: &reason })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(CancellationOutcome::Cancelled);
        }

        // Already cancelled or expired on the provider side.
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            tracing::info!(
                provider_subscription_id = %provider_subscription_id,
                "Provider subscription already inactive"
            );
            return Ok(CancellationOutcome::AlreadyInactive);
        }

        Err(self
            .error_from_response(response, tokens, "cancel_subscription")
            .await)
    }

    fn is_configured(&self) -> bool {
        self.tokens.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::{CanonicalMessage, TransmissionHeaders};

    fn unconfigured() -> PayPalBillingAdapter {
        PayPalBillingAdapter::new(reqwest::Client::new(), "http://127.0.0.1:9", None)
    }

    fn request() -> SignatureVerificationRequest {
        let headers = TransmissionHeaders {
            transmission_id: "t-1".to_string(),
            transmission_time: "2024-01-01T00:00:00Z".to_string(),
            transmission_sig: "sig".to_string(),
            cert_url: "https://api.paypal.com/cert.pem".to_string(),
            auth_algo: "SHA256withRSA".to_string(),
        };
        let canonical_message = CanonicalMessage::new(&headers, "WH-1", b"{}");
        SignatureVerificationRequest {
            headers,
            webhook_id: "WH-1".to_string(),
            canonical_message,
            webhook_event: serde_json::value::RawValue::from_string("{}".to_string()).unwrap(),
        }
    }

    #[test]
    fn reason_is_truncated_to_provider_limit() {
        let long = "x".repeat(300);
        assert_eq!(truncate_reason(&long).chars().count(), 128);
        assert_eq!(truncate_reason("short"), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(200);
        assert_eq!(truncate_reason(&long).chars().count(), 128);
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let adapter = PayPalBillingAdapter::new(reqwest::Client::new(), "https://api.example.com/", None);
        assert_eq!(adapter.api_base_url, "https://api.example.com");
    }

    #[tokio::test]
    async fn unconfigured_adapter_refuses_verification() {
        let adapter = unconfigured();
        assert!(!adapter.is_configured());

        let err = adapter.verify_webhook_signature(&request()).await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NotConfigured);
    }

    #[tokio::test]
    async fn unconfigured_adapter_refuses_cancellation() {
        let adapter = unconfigured();
        let id = ProviderSubscriptionId::new("I-ABC").unwrap();

        let err = adapter.cancel_subscription(&id, "test").await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NotConfigured);
    }
}
