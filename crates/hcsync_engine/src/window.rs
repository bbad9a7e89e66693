//! Sync window resolution.

use crate::config::{RangeMode, SyncConfig, SyncMode};
use chrono::{DateTime, Utc};
use hcsync_protocol::TimeRange;
use tracing::warn;

/// Resolves the window a pass reads.
///
/// - `Days` + full: `[now - periodDays, now]`
/// - `Days` + incremental: `[cursor, now]`, or the full window without a
///   cursor
/// - `Range`: `[rangeStart, rangeEnd or now]`
///
/// A cursor later than `now` is clamped to `now`. An unusable range (no
/// start, or start after end) falls back to the trailing-days window.
pub fn resolve_window(
    config: &SyncConfig,
    cursor: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TimeRange {
    if config.range_mode == RangeMode::Range {
        match config.range_start {
            Some(start) => {
                let end = config.range_end.unwrap_or(now);
                if let Ok(range) = TimeRange::new(start, end) {
                    return range;
                }
                warn!(%start, %end, "sync range starts after it ends, using trailing days");
            }
            None => warn!("sync range has no start date, using trailing days"),
        }
    }

    match (config.mode, cursor) {
        (SyncMode::Incremental, Some(cursor)) => TimeRange::clamped(cursor, now),
        _ => TimeRange::trailing_days(now, config.period_days.max(1)),
    }
}
