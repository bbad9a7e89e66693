//! Configuration for the sync engine.
//!
//! Two layers:
//! - [`EngineConfig`]: tuning constants fixed when the engine is built
//! - [`Settings`]: user state read from the [`SettingsStore`] at the start of
//!   every task, so changes made while a task is idle are always observed

use crate::error::SyncResult;
use chrono::{DateTime, NaiveDate, Utc};
use hcsync_protocol::{RecordType, TokenPair};
use hcsync_storage::SettingsStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Server used when no `apiBase` is stored.
pub const DEFAULT_BASE_URL: &str = "https://api.hcgateway.shuchir.dev";

/// Settings keys.
pub mod keys {
    /// Server base URL.
    pub const API_BASE: &str = "apiBase";
    /// Access token. Absent means logged out.
    pub const ACCESS_TOKEN: &str = "login";
    /// Refresh token.
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Sync cursor, RFC 3339.
    pub const LAST_SYNC: &str = "lastSync";
    /// Sync interval in milliseconds.
    pub const TASK_DELAY: &str = "taskDelay";
    /// `"true"` for full sync, `"false"` for incremental.
    pub const FULL_SYNC_MODE: &str = "fullSyncMode";
    /// Lookback in days.
    pub const SYNC_PERIOD_DAYS: &str = "syncPeriodDays";
    /// `"days"` or `"range"`.
    pub const SYNC_MODE: &str = "syncMode";
    /// Explicit range start.
    pub const SYNC_START_DATE: &str = "syncStartDate";
    /// Explicit range end.
    pub const SYNC_END_DATE: &str = "syncEndDate";

    /// Every key the engine reads.
    pub const ALL: &[&str] = &[
        API_BASE,
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        LAST_SYNC,
        TASK_DELAY,
        FULL_SYNC_MODE,
        SYNC_PERIOD_DAYS,
        SYNC_MODE,
        SYNC_START_DATE,
        SYNC_END_DATE,
    ];
}

/// Tuning constants for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause between uploads of detail-required records.
    pub detail_delay: Duration,
    /// Timeout applied by the production HTTP client.
    pub request_timeout: Duration,
    /// Token refresh interval.
    pub refresh_interval: Duration,
    /// Sync interval used when `taskDelay` is unset or malformed.
    pub default_sync_interval: Duration,
    /// Record types visited by a pass, in order.
    pub record_types: Vec<RecordType>,
    /// Lock file shared by every process syncing the same data. A pass
    /// that finds it held is skipped.
    pub pass_lock: Option<PathBuf>,
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            detail_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(3 * 60 * 60),
            default_sync_interval: Duration::from_secs(2 * 60 * 60),
            record_types: RecordType::ALL.to_vec(),
            pass_lock: None,
        }
    }

    /// Sets the pause between detail uploads.
    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the token refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the fallback sync interval.
    pub fn with_default_sync_interval(mut self, interval: Duration) -> Self {
        self.default_sync_interval = interval;
        self
    }

    /// Guards passes with a lock file at `path`.
    pub fn with_pass_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.pass_lock = Some(path.into());
        self
    }

    /// Restricts a pass to the given types.
    pub fn with_record_types(mut self, types: &[RecordType]) -> Self {
        self.record_types = types.to_vec();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a pass re-reads the whole lookback or resumes from the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Always read `periodDays` back from now.
    #[default]
    Full,
    /// Read from the cursor, or `periodDays` back when there is none.
    Incremental,
}

/// How the window is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMode {
    /// A trailing number of days.
    #[default]
    Days,
    /// Explicit start and end dates.
    Range,
}

impl RangeMode {
    fn as_str(self) -> &'static str {
        match self {
            RangeMode::Days => "days",
            RangeMode::Range => "range",
        }
    }
}

/// User-chosen sync window settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Full or incremental.
    pub mode: SyncMode,
    /// Lookback in days. Always positive.
    pub period_days: u32,
    /// Trailing days or explicit range.
    pub range_mode: RangeMode,
    /// Start of the explicit range.
    pub range_start: Option<DateTime<Utc>>,
    /// End of the explicit range; now when unset.
    pub range_end: Option<DateTime<Utc>>,
}

impl SyncConfig {
    /// Lookback used when `syncPeriodDays` is unset or malformed.
    pub const DEFAULT_PERIOD_DAYS: u32 = 30;

    /// Creates a trailing-days configuration.
    pub fn days(mode: SyncMode, period_days: u32) -> Self {
        Self {
            mode,
            period_days: period_days.max(1),
            ..Self::default()
        }
    }

    /// Creates an explicit-range configuration.
    pub fn range(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            range_mode: RangeMode::Range,
            range_start: Some(start),
            range_end: end,
            ..Self::default()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Full,
            period_days: Self::DEFAULT_PERIOD_DAYS,
            range_mode: RangeMode::Days,
            range_start: None,
            range_end: None,
        }
    }
}

/// Stored tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token for API calls.
    pub access_token: Option<String>,
    /// Token exchanged for a new pair by the refresh task.
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Returns true if an access token is stored.
    pub fn is_logged_in(&self) -> bool {
        self.access_token.is_some()
    }
}

/// A snapshot of everything the engine reads from the settings store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Server base URL without a trailing slash.
    pub base_url: String,
    /// Stored tokens.
    pub credentials: Credentials,
    /// Last pass start.
    pub cursor: Option<DateTime<Utc>>,
    /// Stored sync interval.
    pub sync_interval: Option<Duration>,
    /// Window settings.
    pub sync: SyncConfig,
}

impl Settings {
    /// Returns the stored sync interval, or `default`.
    pub fn sync_interval_or(&self, default: Duration) -> Duration {
        self.sync_interval.unwrap_or(default)
    }
}

/// Typed access to the settings store.
///
/// Malformed values never fail a load; they fall back to defaults with a
/// warning. Store failures do propagate.
pub trait SettingsExt {
    /// Reads a snapshot of all engine settings.
    fn load_settings(&self) -> SyncResult<Settings>;

    /// Stores a freshly issued token pair.
    fn save_tokens(&self, tokens: &TokenPair) -> SyncResult<()>;

    /// Removes both tokens.
    fn clear_credentials(&self) -> SyncResult<()>;

    /// Stores the sync cursor.
    fn save_cursor(&self, cursor: DateTime<Utc>) -> SyncResult<()>;

    /// Stores the window settings.
    fn save_sync_config(&self, config: &SyncConfig) -> SyncResult<()>;

    /// Stores the sync interval.
    fn save_sync_interval(&self, interval: Duration) -> SyncResult<()>;

    /// Stores the server base URL.
    fn save_base_url(&self, base_url: &str) -> SyncResult<()>;
}

impl<S: SettingsStore + ?Sized> SettingsExt for S {
    fn load_settings(&self) -> SyncResult<Settings> {
        let base_url = read(self, keys::API_BASE)?
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let credentials = Credentials {
            access_token: read(self, keys::ACCESS_TOKEN)?.filter(|t| !t.is_empty()),
            refresh_token: read(self, keys::REFRESH_TOKEN)?.filter(|t| !t.is_empty()),
        };

        let cursor = read(self, keys::LAST_SYNC)?.and_then(|v| parse_instant(keys::LAST_SYNC, &v));

        let sync_interval = read(self, keys::TASK_DELAY)?.and_then(|v| match v.parse::<u64>() {
            Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
            _ => {
                warn!(key = keys::TASK_DELAY, value = %v, "ignoring malformed setting");
                None
            }
        });

        let mode = match read(self, keys::FULL_SYNC_MODE)?.as_deref() {
            None | Some("true") => SyncMode::Full,
            Some("false") => SyncMode::Incremental,
            Some(other) => {
                warn!(key = keys::FULL_SYNC_MODE, value = %other, "ignoring malformed setting");
                SyncMode::Full
            }
        };

        let period_days = match read(self, keys::SYNC_PERIOD_DAYS)? {
            None => SyncConfig::DEFAULT_PERIOD_DAYS,
            Some(v) => match v.parse::<u32>() {
                Ok(days) if days > 0 => days,
                _ => {
                    warn!(key = keys::SYNC_PERIOD_DAYS, value = %v, "ignoring malformed setting");
                    SyncConfig::DEFAULT_PERIOD_DAYS
                }
            },
        };

        let range_mode = match read(self, keys::SYNC_MODE)?.as_deref() {
            None | Some("days") => RangeMode::Days,
            Some("range") => RangeMode::Range,
            Some(other) => {
                warn!(key = keys::SYNC_MODE, value = %other, "ignoring malformed setting");
                RangeMode::Days
            }
        };

        let range_start = read(self, keys::SYNC_START_DATE)?
            .and_then(|v| parse_instant(keys::SYNC_START_DATE, &v));
        let range_end =
            read(self, keys::SYNC_END_DATE)?.and_then(|v| parse_instant(keys::SYNC_END_DATE, &v));

        Ok(Settings {
            base_url,
            credentials,
            cursor,
            sync_interval,
            sync: SyncConfig {
                mode,
                period_days,
                range_mode,
                range_start,
                range_end,
            },
        })
    }

    fn save_tokens(&self, tokens: &TokenPair) -> SyncResult<()> {
        self.set(keys::ACCESS_TOKEN, &tokens.access_token)?;
        self.set(keys::REFRESH_TOKEN, &tokens.refresh_token)?;
        Ok(())
    }

    fn clear_credentials(&self) -> SyncResult<()> {
        self.remove(keys::ACCESS_TOKEN)?;
        self.remove(keys::REFRESH_TOKEN)?;
        Ok(())
    }

    fn save_cursor(&self, cursor: DateTime<Utc>) -> SyncResult<()> {
        self.set(keys::LAST_SYNC, &cursor.to_rfc3339())?;
        Ok(())
    }

    fn save_sync_config(&self, config: &SyncConfig) -> SyncResult<()> {
        let full = matches!(config.mode, SyncMode::Full);
        self.set(keys::FULL_SYNC_MODE, if full { "true" } else { "false" })?;
        self.set(keys::SYNC_PERIOD_DAYS, &config.period_days.max(1).to_string())?;
        self.set(keys::SYNC_MODE, config.range_mode.as_str())?;
        match config.range_start {
            Some(start) => self.set(keys::SYNC_START_DATE, &start.to_rfc3339())?,
            None => self.remove(keys::SYNC_START_DATE)?,
        }
        match config.range_end {
            Some(end) => self.set(keys::SYNC_END_DATE, &end.to_rfc3339())?,
            None => self.remove(keys::SYNC_END_DATE)?,
        }
        Ok(())
    }

    fn save_sync_interval(&self, interval: Duration) -> SyncResult<()> {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self.set(keys::TASK_DELAY, &ms.to_string())?;
        Ok(())
    }

    fn save_base_url(&self, base_url: &str) -> SyncResult<()> {
        self.set(keys::API_BASE, base_url.trim_end_matches('/'))?;
        Ok(())
    }
}

/// Reads a value, unwrapping a JSON-quoted string if the host stored one.
fn read<S: SettingsStore + ?Sized>(store: &S, key: &str) -> SyncResult<Option<String>> {
    Ok(store.get(key)?.map(|raw| {
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            serde_json::from_str::<String>(&raw).unwrap_or(raw)
        } else {
            raw
        }
    }))
}

/// Parses an RFC 3339 instant, or a bare date taken as midnight UTC.
fn parse_instant(key: &str, value: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    if let Some(t) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(t.and_utc());
    }
    warn!(key, value, "ignoring malformed setting");
    None
}
