//! Time windows for store queries.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A closed time window `[start, end]`.
///
/// # Invariants
///
/// - `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(rename = "startTime")]
    start: DateTime<Utc>,
    #[serde(rename = "endTime")]
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ProtocolResult<Self> {
        if start > end {
            return Err(ProtocolError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a range, moving `start` back to `end` when it lies after it.
    pub fn clamped(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: start.min(end),
            end,
        }
    }

    /// Creates the range covering the `days` days that end at `end`.
    ///
    /// A lookback reaching past the earliest representable instant starts
    /// there instead.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        let start = Duration::try_days(i64::from(days))
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    /// Start of the window.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the window.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if the window has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `instant` falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn new_rejects_inverted_range() {
        assert!(TimeRange::new(at(1), at(2)).is_ok());
        assert!(TimeRange::new(at(2), at(2)).is_ok());
        assert!(matches!(
            TimeRange::new(at(3), at(2)),
            Err(ProtocolError::InvalidRange { .. })
        ));
    }

    #[test]
    fn clamped_never_inverts() {
        let range = TimeRange::clamped(at(5), at(2));
        assert_eq!(range.start(), at(2));
        assert!(range.is_empty());
    }

    #[test]
    fn trailing_days_spans_whole_days() {
        let range = TimeRange::trailing_days(at(12), 7);
        assert_eq!(range.duration(), Duration::days(7));
        assert_eq!(range.end(), at(12));
    }

    #[test]
    fn contains_is_inclusive() {
        let range = TimeRange::new(at(1), at(3)).unwrap();
        assert!(range.contains(at(1)));
        assert!(range.contains(at(3)));
        assert!(!range.contains(at(4)));
    }

    #[test]
    fn serializes_as_filter_fields() {
        let range = TimeRange::new(at(1), at(2)).unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json["startTime"], "2024-05-01T01:00:00Z");
        assert_eq!(json["endTime"], "2024-05-01T02:00:00Z");
    }

    #[test]
    fn trailing_days_saturates_at_earliest_instant() {
        let range = TimeRange::trailing_days(at(12), u32::MAX);
        assert_eq!(range.start(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(range.end(), at(12));
        assert!(range.contains(at(0)));
    }

    proptest::proptest! {
        #[test]
        fn clamped_is_ordered_and_holds_its_end(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
            let start = Utc.timestamp_opt(a, 0).unwrap();
            let end = Utc.timestamp_opt(b, 0).unwrap();
            let range = TimeRange::clamped(start, end);
            proptest::prop_assert!(range.start() <= range.end());
            proptest::prop_assert_eq!(range.end(), end);
            proptest::prop_assert!(range.contains(end));
        }

        #[test]
        fn trailing_days_spans_exactly(days in 1u32..3650) {
            let range = TimeRange::trailing_days(at(0), days);
            proptest::prop_assert_eq!(range.duration(), Duration::days(i64::from(days)));
        }
    }
}
