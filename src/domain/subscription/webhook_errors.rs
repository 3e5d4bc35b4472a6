//! Webhook error types for provider webhook handling.
//!
//! Every error maps to the HTTP status the provider sees, which decides
//! whether it redelivers the event.

use axum::http::StatusCode;
use thiserror::Error;

use super::SubscriptionError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook id or provider credentials are not configured.
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    /// A required transmission header is absent or empty.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// The signing certificate is not hosted on a provider domain.
    #[error("Untrusted certificate URL: {0}")]
    UntrustedCertUrl(String),

    /// The provider did not confirm the signature, or could not be asked.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// A verified payload lacks a field needed to route it.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// No subscription row exists yet for the event's resource id.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_)
                | WebhookError::SubscriptionNotFound(_) // row may not be written yet
                | WebhookError::MissingConfiguration(_)
        )
    }

    /// Returns true for failures that reject the sender as unauthenticated.
    pub fn is_authenticity_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingHeader(_)
                | WebhookError::UntrustedCertUrl(_)
                | WebhookError::VerificationFailed(_)
        )
    }

    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// - 4xx: rejected, no redelivery
    /// - 5xx: redelivered later
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingHeader(_)
            | WebhookError::UntrustedCertUrl(_)
            | WebhookError::VerificationFailed(_) => StatusCode::UNAUTHORIZED,

            WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::MissingConfiguration(_)
            | WebhookError::SubscriptionNotFound(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SubscriptionError> for WebhookError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::SubscriptionNotFound(id) => WebhookError::SubscriptionNotFound(id),
            SubscriptionError::Authenticity(reason) => WebhookError::VerificationFailed(reason),
            SubscriptionError::Configuration(_) => {
                WebhookError::MissingConfiguration("billing credentials")
            }
            other => WebhookError::Database(other.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Status Code Mapping
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authenticity_failures_return_401() {
        for err in [
            WebhookError::MissingHeader("paypal-transmission-sig"),
            WebhookError::UntrustedCertUrl("https://evil.example/cert".to_string()),
            WebhookError::VerificationFailed("FAILURE".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{}", err);
            assert!(err.is_authenticity_failure());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn missing_configuration_returns_500() {
        let err = WebhookError::MissingConfiguration("webhook_id");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_authenticity_failure());
    }

    #[test]
    fn missing_row_is_retried_by_provider() {
        let err = WebhookError::SubscriptionNotFound("I-ABC".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_field_returns_400() {
        assert_eq!(
            WebhookError::MissingField("resource.id").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Conversion
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_not_found_converts_to_retryable_webhook_error() {
        let err: WebhookError = SubscriptionError::subscription_not_found("I-ABC").into();
        assert!(matches!(err, WebhookError::SubscriptionNotFound(ref id) if id == "I-ABC"));
    }

    #[test]
    fn infrastructure_converts_to_database() {
        let err: WebhookError = SubscriptionError::infrastructure("pool timeout").into();
        assert!(matches!(err, WebhookError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
