//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    UserNotFound,
    SubscriptionNotFound,

    // State errors
    SubscriptionExists,

    // Authenticity / configuration errors
    Unauthorized,
    ConfigurationMissing,

    // Billing provider errors
    ProviderUnavailable,
    ProviderError,

    // Infrastructure errors
    DatabaseError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::SubscriptionExists => "SUBSCRIPTION_EXISTS",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::ConfigurationMissing => "CONFIGURATION_MISSING",
            ErrorCode::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::UserNotFound, "User not found").with_detail("user_id", user_id)
    }

    pub fn subscription_not_found(provider_subscription_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            .with_detail("provider_subscription_id", provider_subscription_id)
    }

    pub fn subscription_exists(provider_subscription_id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SubscriptionExists,
            "Subscription already exists for this provider id",
        )
        .with_detail("provider_subscription_id", provider_subscription_id)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field } | ValidationError::InvalidFormat { field, .. } => {
                field.clone()
            }
        };
        DomainError::validation(field, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_field() {
        let err = ValidationError::empty_field("provider_subscription_id");
        assert_eq!(
            format!("{}", err),
            "Field 'provider_subscription_id' cannot be empty"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::SubscriptionExists, "Subscription already exists");
        assert_eq!(
            format!("{}", err),
            "[SUBSCRIPTION_EXISTS] Subscription already exists"
        );
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::database("connection reset")
            .with_detail("operation", "create_subscription_atomic");

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(
            err.details.get("operation"),
            Some(&"create_subscription_atomic".to_string())
        );
    }

    #[test]
    fn keyed_constructors_carry_identifiers() {
        let err = DomainError::subscription_exists("I-ABC");
        assert_eq!(err.code, ErrorCode::SubscriptionExists);
        assert_eq!(
            err.details.get("provider_subscription_id"),
            Some(&"I-ABC".to_string())
        );

        let err = DomainError::user_not_found("user-1");
        assert_eq!(err.code, ErrorCode::UserNotFound);
        assert_eq!(err.details.get("user_id"), Some(&"user-1".to_string()));
    }

    #[test]
    fn validation_error_converts_with_field_detail() {
        let err: DomainError = ValidationError::invalid_format("status", "unknown").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field"), Some(&"status".to_string()));
    }
}
