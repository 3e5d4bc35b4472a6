//! Subscription status state machine.
//!
//! Mirrors the statuses the billing provider reports for a recurring
//! subscription. `Cancelled` and `Expired` are terminal: nothing moves a row
//! out of them, reactivation creates a new subscription instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Internal subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Row written before the provider confirmed activation.
    Pending,

    /// Billing is running and the user has access.
    Active,

    /// Ended by the user, an operator or a compensating rollback.
    Cancelled,

    /// Paused by the provider, typically after failed payments.
    Suspended,

    /// Reached the end of its billing cycles.
    Expired,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Active,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Suspended,
        SubscriptionStatus::Expired,
    ];

    /// Database and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Statuses a caller may request for a freshly created row.
    pub fn is_valid_initial(&self) -> bool {
        matches!(self, SubscriptionStatus::Pending | SubscriptionStatus::Active)
    }

    /// Statuses `cancel_subscription_atomic` is allowed to cancel.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Pending | SubscriptionStatus::Active | SubscriptionStatus::Suspended
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Cancelled, Suspended, Expired],
            Active => vec![Cancelled, Suspended, Expired],
            Suspended => vec![Active, Cancelled, Expired],
            Cancelled | Expired => vec![],
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "suspended" => Ok(SubscriptionStatus::Suspended),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_can_move_anywhere() {
        for target in [Active, Cancelled, Suspended, Expired] {
            assert!(Pending.can_transition_to(&target), "{:?}", target);
        }
    }

    #[test]
    fn active_cannot_return_to_pending() {
        assert!(!Active.can_transition_to(&Pending));
        assert!(Active.transition_to(Pending).is_err());
    }

    #[test]
    fn suspended_can_be_reactivated_by_the_provider() {
        assert_eq!(Suspended.transition_to(Active), Ok(Active));
    }

    #[test]
    fn terminal_statuses_never_move_back_to_active() {
        for terminal in [Cancelled, Expired] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&Active));
            assert!(terminal.can_transition_to(&terminal));
        }
    }

    #[test]
    fn every_status_accepts_itself() {
        for status in SubscriptionStatus::ALL {
            assert!(status.can_transition_to(&status));
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Representation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn string_form_round_trips_through_from_str() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>(), Ok(status));
        }
        assert!("ACTIVE".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&Suspended).unwrap(), "\"suspended\"");
    }

    #[test]
    fn only_pending_and_active_are_initial() {
        assert!(Pending.is_valid_initial());
        assert!(Active.is_valid_initial());
        assert!(!Suspended.is_valid_initial());
    }

    #[test]
    fn terminal_statuses_are_not_cancellable() {
        assert!(Suspended.is_cancellable());
        assert!(!Cancelled.is_cancellable());
        assert!(!Expired.is_cancellable());
    }
}
