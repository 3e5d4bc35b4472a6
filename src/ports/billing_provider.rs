//! Billing provider port for the recurring-billing REST API.
//!
//! Covers the two provider calls the subscription lifecycle needs: asking the
//! provider to confirm a webhook signature, and cancelling a subscription.
//!
//! # Design
//!
//! - **Fail closed**: anything other than an explicit success is a rejection
//! - **Idempotent cancel**: cancelling an inactive subscription is not an error

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::domain::foundation::ProviderSubscriptionId;
use crate::domain::subscription::{CanonicalMessage, SubscriptionError, TransmissionHeaders};

/// Port for billing provider integrations.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Submit webhook signature material to the provider for verification.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` when credentials are missing
    /// - `AuthenticationError` when the token exchange is rejected
    /// - `NetworkError` / `Timeout` when the provider cannot be reached
    /// - `InvalidResponse` when the reply cannot be parsed
    async fn verify_webhook_signature(
        &self,
        request: &SignatureVerificationRequest,
    ) -> Result<VerificationStatus, PaymentError>;

    /// Cancel a subscription on the provider side.
    ///
    /// Returns `AlreadyInactive` instead of an error when the subscription is
    /// already cancelled or expired.
    async fn cancel_subscription(
        &self,
        provider_subscription_id: &ProviderSubscriptionId,
        reason: &str,
    ) -> Result<CancellationOutcome, PaymentError>;

    /// Whether credentials are present. Checked before any call is attempted.
    fn is_configured(&self) -> bool;
}

/// Everything the provider's verification endpoint needs.
#[derive(Debug, Clone)]
pub struct SignatureVerificationRequest {
    pub headers: TransmissionHeaders,
    pub webhook_id: String,
    pub canonical_message: CanonicalMessage,
    /// Webhook body exactly as delivered, echoed back to the provider.
    pub webhook_event: Box<RawValue>,
}

/// Provider verdict on a webhook signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Success,
    /// Any other status string the provider returned.
    Failure(String),
}

impl VerificationStatus {
    pub fn from_provider(status: &str) -> Self {
        if status == "SUCCESS" {
            VerificationStatus::Success
        } else {
            VerificationStatus::Failure(status.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, VerificationStatus::Success)
    }
}

/// Result of a provider-side cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationOutcome {
    Cancelled,
    AlreadyInactive,
}

/// Errors from billing provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error name (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    pub fn not_configured(missing: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotConfigured,
            format!("{} is not configured", missing),
        )
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for SubscriptionError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::NetworkError
            | PaymentErrorCode::Timeout
            | PaymentErrorCode::RateLimitExceeded => SubscriptionError::TransientNetwork(err.message),
            PaymentErrorCode::NotConfigured => SubscriptionError::Configuration(err.message),
            PaymentErrorCode::NotFound => SubscriptionError::SubscriptionNotFound(err.message),
            PaymentErrorCode::AuthenticationError
            | PaymentErrorCode::InvalidResponse
            | PaymentErrorCode::ProviderError => SubscriptionError::Provider(err.to_string()),
        }
    }
}

/// Billing provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Connection failure.
    NetworkError,

    /// The call exceeded its time budget.
    Timeout,

    /// Client credentials or bearer token rejected.
    AuthenticationError,

    /// Credentials or ids absent from configuration.
    NotConfigured,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Reply body could not be parsed.
    InvalidResponse,

    /// Any other provider-side failure.
    ProviderError,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotConfigured => "not_configured",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidResponse => "invalid_response",
            PaymentErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_success_is_success() {
        assert!(VerificationStatus::from_provider("SUCCESS").is_success());
        for other in ["FAILURE", "success", "", "SUCCESS "] {
            assert_eq!(
                VerificationStatus::from_provider(other),
                VerificationStatus::Failure(other.to_string())
            );
        }
    }

    #[test]
    fn timeouts_and_network_errors_are_retryable() {
        assert!(PaymentError::timeout("slow").retryable);
        assert!(PaymentError::network("reset").retryable);
        assert!(!PaymentError::authentication("bad secret").retryable);
        assert!(!PaymentError::not_configured("client_id").retryable);
    }

    #[test]
    fn display_includes_code() {
        let err = PaymentError::not_found("Subscription I-ABC");
        assert_eq!(err.to_string(), "not_found: Subscription I-ABC not found");
    }

    #[test]
    fn converts_to_subscription_error_by_category() {
        assert!(matches!(
            SubscriptionError::from(PaymentError::timeout("slow")),
            SubscriptionError::TransientNetwork(_)
        ));
        assert!(matches!(
            SubscriptionError::from(PaymentError::not_configured("webhook_id")),
            SubscriptionError::Configuration(_)
        ));
        assert!(matches!(
            SubscriptionError::from(PaymentError::authentication("401")),
            SubscriptionError::Provider(_)
        ));
    }

    #[test]
    fn provider_code_is_attached() {
        let err = PaymentError::provider("unprocessable").with_provider_code("UNPROCESSABLE_ENTITY");
        assert_eq!(err.provider_code.as_deref(), Some("UNPROCESSABLE_ENTITY"));
    }
}
