//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Negative if `other` is after `self`.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Adds whole calendar months, clamping to the last day of shorter months
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn add_months(&self, months: u32) -> Self {
        self.0
            .checked_add_months(Months::new(months))
            .map(Self)
            .unwrap_or(*self)
    }

    /// Saturates at the representable range instead of overflowing.
    pub fn plus_secs(&self, secs: i64) -> Self {
        let delta = Duration::seconds(secs.clamp(-MAX_DELTA_SECS, MAX_DELTA_SECS));
        match self.0.checked_add_signed(delta) {
            Some(dt) => Self(dt),
            None if secs > 0 => Self(DateTime::<Utc>::MAX_UTC),
            None => Self(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub fn minus_secs(&self, secs: i64) -> Self {
        self.plus_secs(secs.saturating_neg())
    }
}

/// Largest whole-second span `chrono::Duration` can hold.
const MAX_DELTA_SECS: i64 = i64::MAX / 1000;

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn add_months_moves_one_calendar_month() {
        assert_eq!(
            at("2024-03-15T10:30:00Z").add_months(1),
            at("2024-04-15T10:30:00Z")
        );
    }

    #[test]
    fn add_months_clamps_to_end_of_short_month() {
        assert_eq!(
            at("2024-01-31T00:00:00Z").add_months(1),
            at("2024-02-29T00:00:00Z")
        );
        assert_eq!(
            at("2023-01-31T00:00:00Z").add_months(1),
            at("2023-02-28T00:00:00Z")
        );
    }

    #[test]
    fn add_months_crosses_year_boundary() {
        assert_eq!(
            at("2024-12-10T08:00:00Z").add_months(1),
            at("2025-01-10T08:00:00Z")
        );
    }

    #[test]
    fn second_arithmetic_is_symmetric() {
        let ts = at("2024-01-15T10:30:00Z");
        assert_eq!(ts.plus_secs(60).minus_secs(60), ts);
        assert_eq!(ts.plus_secs(90).duration_since(&ts), Duration::seconds(90));
        assert!(ts.is_before(&ts.plus_secs(1)));
    }

    #[test]
    fn second_arithmetic_saturates_instead_of_overflowing() {
        let ts = at("2024-01-15T10:30:00Z");
        assert_eq!(ts.plus_secs(10_000_000_000_000).into_datetime(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(ts.plus_secs(i64::MAX).into_datetime(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(ts.minus_secs(i64::MAX).into_datetime(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(ts.minus_secs(i64::MIN).into_datetime(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let json = serde_json::to_string(&at("2024-01-15T10:30:00Z")).unwrap();
        assert_eq!(json, "\"2024-01-15T10:30:00Z\"");
    }
}
