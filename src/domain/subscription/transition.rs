//! Event-to-status mapping.
//!
//! Every recognised provider event resolves to a single [`StatusUpdate`]:
//! the target status plus the only timestamp fields that event is allowed to
//! write. Applying the same update twice leaves the row as applying it once.

use super::{ProviderEventType, SubscriptionStatus};
use crate::domain::foundation::Timestamp;

/// How a timestamp column is written by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWrite {
    /// Column left as is.
    Keep,
    /// Column written only when it is currently null.
    SetIfNull(Timestamp),
    /// Column overwritten.
    Set(Timestamp),
}

impl FieldWrite {
    /// Resolves the write against the current column value.
    pub fn resolve(&self, current: Option<Timestamp>) -> Option<Timestamp> {
        match self {
            FieldWrite::Keep => current,
            FieldWrite::SetIfNull(value) => current.or(Some(*value)),
            FieldWrite::Set(value) => Some(*value),
        }
    }
}

/// A single keyed write produced by a provider event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: SubscriptionStatus,
    pub start_date: FieldWrite,
    pub next_billing_date: FieldWrite,
}

impl StatusUpdate {
    /// Status change with no timestamp side effects.
    pub fn status_only(status: SubscriptionStatus) -> Self {
        Self {
            status,
            start_date: FieldWrite::Keep,
            next_billing_date: FieldWrite::Keep,
        }
    }
}

/// What an event means for the stored subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventEffect {
    /// Write this update to the row keyed by the event's resource id.
    Update(StatusUpdate),
    /// Recognised, but carries nothing to store.
    Informational,
    /// Not an event this service handles.
    Ignored,
}

impl EventEffect {
    /// Maps an event type to its effect at instant `now`.
    pub fn for_event(event_type: &ProviderEventType, now: Timestamp) -> Self {
        use SubscriptionStatus::*;

        match event_type {
            ProviderEventType::SubscriptionCreated => EventEffect::Update(StatusUpdate {
                status: Active,
                start_date: FieldWrite::SetIfNull(now),
                next_billing_date: FieldWrite::Keep,
            }),
            ProviderEventType::SubscriptionActivated => {
                EventEffect::Update(StatusUpdate::status_only(Active))
            }
            ProviderEventType::SubscriptionUpdated => EventEffect::Informational,
            ProviderEventType::SubscriptionCancelled => {
                EventEffect::Update(StatusUpdate::status_only(Cancelled))
            }
            ProviderEventType::SubscriptionSuspended => {
                EventEffect::Update(StatusUpdate::status_only(Suspended))
            }
            ProviderEventType::SubscriptionExpired => {
                EventEffect::Update(StatusUpdate::status_only(Expired))
            }
            ProviderEventType::PaymentSaleCompleted => EventEffect::Update(StatusUpdate {
                status: Active,
                start_date: FieldWrite::Keep,
                next_billing_date: FieldWrite::Set(now.add_months(1)),
            }),
            ProviderEventType::Unknown(_) => EventEffect::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    fn update_for(event: ProviderEventType, now: Timestamp) -> StatusUpdate {
        match EventEffect::for_event(&event, now) {
            EventEffect::Update(update) => update,
            other => panic!("expected update for {}, got {:?}", event, other),
        }
    }

    #[test]
    fn created_activates_and_stamps_start_date_once() {
        let now = Timestamp::now();
        let update = update_for(ProviderEventType::SubscriptionCreated, now);
        assert_eq!(update.status, Active);
        assert_eq!(update.start_date, FieldWrite::SetIfNull(now));
        assert_eq!(update.next_billing_date, FieldWrite::Keep);
    }

    #[test]
    fn plain_status_events_touch_no_dates() {
        let now = Timestamp::now();
        for (event, status) in [
            (ProviderEventType::SubscriptionActivated, Active),
            (ProviderEventType::SubscriptionCancelled, Cancelled),
            (ProviderEventType::SubscriptionSuspended, Suspended),
            (ProviderEventType::SubscriptionExpired, Expired),
        ] {
            assert_eq!(update_for(event, now), StatusUpdate::status_only(status));
        }
    }

    #[test]
    fn payment_completed_pushes_next_billing_one_month_out() {
        let now = Timestamp::now();
        let update = update_for(ProviderEventType::PaymentSaleCompleted, now);
        assert_eq!(update.status, Active);
        assert_eq!(update.start_date, FieldWrite::Keep);
        assert_eq!(update.next_billing_date, FieldWrite::Set(now.add_months(1)));
    }

    #[test]
    fn updated_is_informational_and_unknown_is_ignored() {
        let now = Timestamp::now();
        assert_eq!(
            EventEffect::for_event(&ProviderEventType::SubscriptionUpdated, now),
            EventEffect::Informational
        );
        assert_eq!(
            EventEffect::for_event(&ProviderEventType::parse("RISK.DISPUTE.CREATED"), now),
            EventEffect::Ignored
        );
    }

    #[test]
    fn only_status_changing_events_produce_updates() {
        let now = Timestamp::now();
        for raw in [
            "BILLING.SUBSCRIPTION.CREATED",
            "BILLING.SUBSCRIPTION.ACTIVATED",
            "BILLING.SUBSCRIPTION.UPDATED",
            "BILLING.SUBSCRIPTION.CANCELLED",
            "BILLING.SUBSCRIPTION.SUSPENDED",
            "BILLING.SUBSCRIPTION.EXPIRED",
            "PAYMENT.SALE.COMPLETED",
            "RISK.DISPUTE.CREATED",
        ] {
            let event = ProviderEventType::parse(raw);
            let updates = matches!(EventEffect::for_event(&event, now), EventEffect::Update(_));
            assert_eq!(event.changes_status(), updates, "{}", raw);
        }
    }

    #[test]
    fn field_write_resolution() {
        let earlier = Timestamp::now().minus_secs(3600);
        let now = Timestamp::now();

        assert_eq!(FieldWrite::Keep.resolve(Some(earlier)), Some(earlier));
        assert_eq!(FieldWrite::Keep.resolve(None), None);
        assert_eq!(FieldWrite::SetIfNull(now).resolve(Some(earlier)), Some(earlier));
        assert_eq!(FieldWrite::SetIfNull(now).resolve(None), Some(now));
        assert_eq!(FieldWrite::Set(now).resolve(Some(earlier)), Some(now));
    }
}
