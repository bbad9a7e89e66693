//! Config command implementation.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand, ValueEnum};
use hcsync_engine::{RangeMode, Settings, SettingsExt, SyncMode};
use hcsync_storage::SettingsStore;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the stored settings
    Show {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change one or more settings
    Set(ConfigChanges),
}

/// Settings to change. Unset flags leave the stored value alone.
#[derive(Debug, Default, Args)]
pub struct ConfigChanges {
    /// Server base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Minutes between background passes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_mins: Option<u64>,

    /// Full re-reads the whole lookback; incremental resumes from the last pass
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Lookback in days
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub period_days: Option<u32>,

    /// Bound the window by trailing days or by explicit dates
    #[arg(long, value_enum)]
    pub range_mode: Option<RangeModeArg>,

    /// Range start (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub range_start: Option<DateTime<Utc>>,

    /// Range end (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant, conflicts_with = "clear_range_end")]
    pub range_end: Option<DateTime<Utc>>,

    /// Forget the range end so the range runs up to now
    #[arg(long)]
    pub clear_range_end: bool,
}

/// Sync mode flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Re-read the whole lookback every pass
    Full,
    /// Resume from the last pass
    Incremental,
}

impl From<ModeArg> for SyncMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Full => SyncMode::Full,
            ModeArg::Incremental => SyncMode::Incremental,
        }
    }
}

/// Range mode flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeModeArg {
    /// Trailing number of days
    Days,
    /// Explicit start and end
    Range,
}

impl From<RangeModeArg> for RangeMode {
    fn from(arg: RangeModeArg) -> Self {
        match arg {
            RangeModeArg::Days => RangeMode::Days,
            RangeModeArg::Range => RangeMode::Range,
        }
    }
}

/// Stored settings as printed by `config show`. Tokens are never shown.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    /// Server base URL.
    pub base_url: String,
    /// Whether an access token is stored.
    pub logged_in: bool,
    /// Last pass start, RFC 3339.
    pub last_sync: Option<String>,
    /// Minutes between background passes, if set.
    pub interval_mins: Option<u64>,
    /// `full` or `incremental`.
    pub mode: &'static str,
    /// Lookback in days.
    pub period_days: u32,
    /// `days` or `range`.
    pub range_mode: &'static str,
    /// Range start, RFC 3339.
    pub range_start: Option<String>,
    /// Range end, RFC 3339.
    pub range_end: Option<String>,
}

impl From<&Settings> for ConfigView {
    fn from(settings: &Settings) -> Self {
        let sync = &settings.sync;
        Self {
            base_url: settings.base_url.clone(),
            logged_in: settings.credentials.is_logged_in(),
            last_sync: settings.cursor.map(|c| c.to_rfc3339()),
            interval_mins: settings.sync_interval.map(|d| d.as_secs() / 60),
            mode: match sync.mode {
                SyncMode::Full => "full",
                SyncMode::Incremental => "incremental",
            },
            period_days: sync.period_days,
            range_mode: match sync.range_mode {
                RangeMode::Days => "days",
                RangeMode::Range => "range",
            },
            range_start: sync.range_start.map(|d| d.to_rfc3339()),
            range_end: sync.range_end.map(|d| d.to_rfc3339()),
        }
    }
}

/// Runs the config command.
pub fn run(data_dir: &Path, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let settings = super::open_settings(data_dir)?;
    match action {
        ConfigAction::Show { format } => {
            let view = ConfigView::from(&settings.load_settings()?);
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&view)?),
                _ => print_text_output(&view),
            }
        }
        ConfigAction::Set(changes) => {
            let applied = apply(&settings, &changes)?;
            if applied == 0 {
                println!("Nothing to change");
            } else {
                println!("Updated {applied} setting(s)");
            }
        }
    }
    Ok(())
}

/// Writes `changes` to `settings` and returns how many flags were applied.
pub fn apply(
    settings: &dyn SettingsStore,
    changes: &ConfigChanges,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut sync = settings.load_settings()?.sync;
    let mut sync_changes = 0;
    if let Some(mode) = changes.mode {
        sync.mode = mode.into();
        sync_changes += 1;
    }
    if let Some(days) = changes.period_days {
        sync.period_days = days;
        sync_changes += 1;
    }
    if let Some(range_mode) = changes.range_mode {
        sync.range_mode = range_mode.into();
        sync_changes += 1;
    }
    if let Some(start) = changes.range_start {
        sync.range_start = Some(start);
        sync_changes += 1;
    }
    if let Some(end) = changes.range_end {
        sync.range_end = Some(end);
        sync_changes += 1;
    }
    if changes.clear_range_end {
        sync.range_end = None;
        sync_changes += 1;
    }
    if let (true, Some(start), Some(end)) = (sync_changes > 0, sync.range_start, sync.range_end) {
        if start > end {
            return Err(format!("range start {start} is after range end {end}").into());
        }
    }

    let mut applied = sync_changes;
    if sync_changes > 0 {
        settings.save_sync_config(&sync)?;
    }
    if let Some(base_url) = &changes.base_url {
        settings.save_base_url(base_url)?;
        applied += 1;
    }
    if let Some(mins) = changes.interval_mins {
        settings.save_sync_interval(Duration::from_secs(mins * 60))?;
        applied += 1;
    }

    Ok(applied)
}

/// Parses `YYYY-MM-DD` as midnight UTC, or a full RFC 3339 instant.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("expected YYYY-MM-DD or RFC 3339, got {value:?}"))
}

fn print_text_output(view: &ConfigView) {
    let unset = "-".to_string();
    println!("Settings");
    println!("========");
    println!("Base URL:    {}", view.base_url);
    println!("Logged in:   {}", view.logged_in);
    println!("Last sync:   {}", view.last_sync.as_ref().unwrap_or(&unset));
    println!(
        "Interval:    {}",
        view.interval_mins
            .map(|m| format!("{m} min"))
            .unwrap_or_else(|| "default".to_string())
    );
    println!("Mode:        {}", view.mode);
    println!("Period:      {} days", view.period_days);
    println!("Range mode:  {}", view.range_mode);
    println!("Range start: {}", view.range_start.as_ref().unwrap_or(&unset));
    println!("Range end:   {}", view.range_end.as_ref().unwrap_or(&unset));
}
