//! Property-based test generators using proptest.
//!
//! Strategies cover every shape of stored sync configuration, including
//! ones the engine must repair (inverted ranges, missing start dates,
//! cursors in the future).

use chrono::{DateTime, Duration, TimeZone, Utc};
use hcsync_engine::{RangeMode, SyncConfig, SyncMode};
use hcsync_protocol::{HealthRecord, RecordType, TimeRange};
use proptest::prelude::*;

use crate::fixtures::record_for;

/// Strategy for instants between 2015 and 2035, at second precision.
pub fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (1_420_070_400i64..2_051_222_400i64).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .expect("timestamp in range")
    })
}

/// Strategy for sync modes.
pub fn sync_mode_strategy() -> impl Strategy<Value = SyncMode> {
    prop_oneof![Just(SyncMode::Full), Just(SyncMode::Incremental)]
}

/// Strategy for range modes.
pub fn range_mode_strategy() -> impl Strategy<Value = RangeMode> {
    prop_oneof![Just(RangeMode::Days), Just(RangeMode::Range)]
}

/// Strategy for any stored sync configuration.
///
/// Range bounds are independent, so inverted and half-open ranges are
/// generated too. Periods cover every positive `u32`, with everyday
/// lookbacks drawn as often as the rest.
pub fn sync_config_strategy() -> impl Strategy<Value = SyncConfig> {
    (
        sync_mode_strategy(),
        prop_oneof![1u32..=365, 1u32..=u32::MAX],
        range_mode_strategy(),
        proptest::option::of(instant_strategy()),
        proptest::option::of(instant_strategy()),
    )
        .prop_map(|(mode, period_days, range_mode, range_start, range_end)| SyncConfig {
            mode,
            period_days,
            range_mode,
            range_start,
            range_end,
        })
}

/// The start of a `days` lookback ending at `end`, saturating at the
/// earliest representable instant.
pub fn lookback_start(end: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|lookback| end.checked_sub_signed(lookback))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Strategy for a stored cursor: absent, in the past, or in the future.
pub fn cursor_strategy() -> impl Strategy<Value = Option<DateTime<Utc>>> {
    proptest::option::of(instant_strategy())
}

/// Strategy for record types.
pub fn record_type_strategy() -> impl Strategy<Value = RecordType> {
    proptest::sample::select(RecordType::ALL.to_vec())
}

/// Strategy for record identifiers.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-f0-9]{8}-[a-f0-9]{4}").expect("Invalid regex")
}

/// Strategy for up to `max` records of `record_type` starting inside
/// `window`, with unique ids.
pub fn record_batch_strategy(
    record_type: RecordType,
    window: TimeRange,
    max: usize,
) -> impl Strategy<Value = Vec<HealthRecord>> {
    let span = window.duration().num_seconds().max(0);
    prop::collection::vec(0..=span, 0..=max).prop_map(move |offsets| {
        offsets
            .into_iter()
            .enumerate()
            .map(|(i, offset)| {
                record_for(
                    record_type,
                    &format!("rec-{i}"),
                    window.start() + Duration::seconds(offset),
                )
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_configs_have_positive_period(config in sync_config_strategy()) {
            prop_assert!(config.period_days > 0);
        }

        #[test]
        fn lookback_start_never_after_end(end in instant_strategy(), days in 1u32..=u32::MAX) {
            prop_assert!(lookback_start(end, days) <= end);
        }

        #[test]
        fn batches_fall_inside_window(
            (window, records) in (instant_strategy(), 0i64..240, record_type_strategy())
                .prop_flat_map(|(start, hours, record_type)| {
                    let window = TimeRange::clamped(start, start + Duration::hours(hours));
                    (Just(window), record_batch_strategy(record_type, window, 5))
                })
        ) {
            for record in records {
                prop_assert!(window.contains(record.start_time().unwrap()));
            }
        }
    }
}
