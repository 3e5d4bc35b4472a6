//! Provider webhook event types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Event types the billing provider delivers for subscriptions.
///
/// Anything not listed is kept verbatim in `Unknown` so it can be logged and
/// acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderEventType {
    SubscriptionCreated,
    SubscriptionActivated,
    SubscriptionUpdated,
    SubscriptionCancelled,
    SubscriptionSuspended,
    SubscriptionExpired,
    PaymentSaleCompleted,
    Unknown(String),
}

impl ProviderEventType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "BILLING.SUBSCRIPTION.CREATED" => Self::SubscriptionCreated,
            "BILLING.SUBSCRIPTION.ACTIVATED" => Self::SubscriptionActivated,
            "BILLING.SUBSCRIPTION.UPDATED" => Self::SubscriptionUpdated,
            "BILLING.SUBSCRIPTION.CANCELLED" => Self::SubscriptionCancelled,
            "BILLING.SUBSCRIPTION.SUSPENDED" => Self::SubscriptionSuspended,
            "BILLING.SUBSCRIPTION.EXPIRED" => Self::SubscriptionExpired,
            "PAYMENT.SALE.COMPLETED" => Self::PaymentSaleCompleted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SubscriptionCreated => "BILLING.SUBSCRIPTION.CREATED",
            Self::SubscriptionActivated => "BILLING.SUBSCRIPTION.ACTIVATED",
            Self::SubscriptionUpdated => "BILLING.SUBSCRIPTION.UPDATED",
            Self::SubscriptionCancelled => "BILLING.SUBSCRIPTION.CANCELLED",
            Self::SubscriptionSuspended => "BILLING.SUBSCRIPTION.SUSPENDED",
            Self::SubscriptionExpired => "BILLING.SUBSCRIPTION.EXPIRED",
            Self::PaymentSaleCompleted => "PAYMENT.SALE.COMPLETED",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Whether the event writes to a stored subscription row.
    pub fn changes_status(&self) -> bool {
        !matches!(self, Self::SubscriptionUpdated | Self::Unknown(_))
    }
}

impl fmt::Display for ProviderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderEventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderEventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
