//! Subscription-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Authenticity | 401 |
//! | Configuration | 500 |
//! | UserNotFound / SubscriptionNotFound | 404 |
//! | Conflict | 409 |
//! | TransientNetwork | 502 |
//! | Provider | 502 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by subscription commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Inbound message could not be proven to come from the provider.
    Authenticity(String),

    /// Required credentials or ids are not configured.
    Configuration(String),

    /// The referenced account does not exist.
    UserNotFound(String),

    /// No matching subscription row exists.
    SubscriptionNotFound(String),

    /// A row already tracks this provider subscription id.
    Conflict(String),

    /// Timeout or connection failure talking to the provider.
    TransientNetwork(String),

    /// The provider answered with a non-retryable error.
    Provider(String),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn authenticity(reason: impl Into<String>) -> Self {
        SubscriptionError::Authenticity(reason.into())
    }

    pub fn configuration(missing: impl Into<String>) -> Self {
        SubscriptionError::Configuration(missing.into())
    }

    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        SubscriptionError::UserNotFound(user_id.into())
    }

    pub fn subscription_not_found(provider_subscription_id: impl Into<String>) -> Self {
        SubscriptionError::SubscriptionNotFound(provider_subscription_id.into())
    }

    pub fn conflict(provider_subscription_id: impl Into<String>) -> Self {
        SubscriptionError::Conflict(provider_subscription_id.into())
    }

    pub fn transient_network(message: impl Into<String>) -> Self {
        SubscriptionError::TransientNetwork(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        SubscriptionError::Provider(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::Authenticity(_) => ErrorCode::Unauthorized,
            SubscriptionError::Configuration(_) => ErrorCode::ConfigurationMissing,
            SubscriptionError::UserNotFound(_) => ErrorCode::UserNotFound,
            SubscriptionError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::Conflict(_) => ErrorCode::SubscriptionExists,
            SubscriptionError::TransientNetwork(_) => ErrorCode::ProviderUnavailable,
            SubscriptionError::Provider(_) => ErrorCode::ProviderError,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::Authenticity(reason) => {
                format!("Request authenticity could not be verified: {}", reason)
            }
            SubscriptionError::Configuration(missing) => {
                format!("Billing integration is not configured: {} missing", missing)
            }
            SubscriptionError::UserNotFound(user_id) => format!("User not found: {}", user_id),
            SubscriptionError::SubscriptionNotFound(id) => {
                format!("Subscription not found: {}", id)
            }
            SubscriptionError::Conflict(id) => {
                format!("Subscription {} is already recorded", id)
            }
            SubscriptionError::TransientNetwork(msg) => {
                format!("Billing provider unavailable: {}", msg)
            }
            SubscriptionError::Provider(msg) => format!("Billing provider error: {}", msg),
            SubscriptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::TransientNetwork(_) | SubscriptionError::Infrastructure(_)
        )
    }

    /// Whether the saga should compensate after this failure.
    ///
    /// A conflict means the provider subscription is already tracked by an
    /// existing row; cancelling it would break that row.
    pub fn requires_compensation(&self) -> bool {
        !matches!(self, SubscriptionError::Conflict(_))
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| {
            err.details
                .get(key)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string())
        };

        match err.code {
            ErrorCode::UserNotFound => SubscriptionError::UserNotFound(detail("user_id")),
            ErrorCode::SubscriptionNotFound => {
                SubscriptionError::SubscriptionNotFound(detail("provider_subscription_id"))
            }
            ErrorCode::SubscriptionExists => {
                SubscriptionError::Conflict(detail("provider_subscription_id"))
            }
            ErrorCode::ValidationFailed => SubscriptionError::ValidationFailed {
                field: detail("field"),
                message: err.message,
            },
            ErrorCode::Unauthorized => SubscriptionError::Authenticity(err.message),
            ErrorCode::ConfigurationMissing => SubscriptionError::Configuration(err.message),
            ErrorCode::ProviderUnavailable => SubscriptionError::TransientNetwork(err.message),
            ErrorCode::ProviderError => SubscriptionError::Provider(err.message),
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        DomainError::from(err).into()
    }
}
