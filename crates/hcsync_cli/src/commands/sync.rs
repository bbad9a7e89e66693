//! Sync command implementation.

use hcsync_engine::{PassOutcome, PassReport, SyncEngine};
use serde::Serialize;
use std::path::Path;

/// Result of a one-off pass.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    /// `completed`, `logged_out` or `already_running`.
    pub outcome: &'static str,
    /// Window start, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<String>,
    /// Window end, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_end: Option<String>,
    /// Records fetched.
    pub fetched: usize,
    /// Records accepted by the server.
    pub uploaded: usize,
    /// Records whose upload failed.
    pub failed: usize,
    /// Types that could not be read.
    pub skipped_types: Vec<String>,
}

impl SyncSummary {
    fn from_outcome(outcome: &PassOutcome) -> Self {
        match outcome {
            PassOutcome::Completed(report) => Self::from_report(report),
            PassOutcome::LoggedOut => Self::empty("logged_out"),
            PassOutcome::AlreadyRunning => Self::empty("already_running"),
        }
    }

    fn from_report(report: &PassReport) -> Self {
        Self {
            outcome: "completed",
            window_start: Some(report.window.start().to_rfc3339()),
            window_end: Some(report.window.end().to_rfc3339()),
            fetched: report.fetched,
            uploaded: report.uploaded,
            failed: report.upload_failures,
            skipped_types: report
                .skipped_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
        }
    }

    fn empty(outcome: &'static str) -> Self {
        Self {
            outcome,
            window_start: None,
            window_end: None,
            fetched: 0,
            uploaded: 0,
            failed: 0,
            skipped_types: Vec::new(),
        }
    }
}

/// Runs the sync command.
pub async fn run(data_dir: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = SyncEngine::new(super::open_context(data_dir)?);
    let outcome = engine.run_pass().await?;
    let summary = SyncSummary::from_outcome(&outcome);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => print_text_output(&summary),
    }

    Ok(())
}

fn print_text_output(summary: &SyncSummary) {
    match summary.outcome {
        "logged_out" => {
            println!("Not logged in; nothing synced.");
            return;
        }
        "already_running" => {
            println!("A sync pass is already running.");
            return;
        }
        _ => {}
    }

    println!("Sync Pass");
    println!("=========");
    if let (Some(start), Some(end)) = (&summary.window_start, &summary.window_end) {
        println!("Window:   {start} .. {end}");
    }
    println!("Fetched:  {}", summary.fetched);
    println!("Uploaded: {}", summary.uploaded);
    println!("Failed:   {}", summary.failed);
    if !summary.skipped_types.is_empty() {
        println!("Skipped:  {}", summary.skipped_types.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hcsync_engine::ProgressCounter;
    use hcsync_protocol::{RecordType, TimeRange};

    #[test]
    fn summary_from_report() {
        let start = Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let report = PassReport {
            started_at: end,
            window: TimeRange::clamped(start, end),
            fetched: 4,
            uploaded: 3,
            upload_failures: 1,
            skipped_types: vec![RecordType::HeartRate],
            progress: ProgressCounter::new(4),
        };

        let summary = SyncSummary::from_outcome(&PassOutcome::Completed(report));
        assert_eq!(summary.outcome, "completed");
        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped_types, vec!["HeartRate".to_string()]);
        assert_eq!(summary.window_end.as_deref(), Some("2024-06-15T12:00:00+00:00"));
    }

    #[test]
    fn logged_out_summary_omits_window() {
        let summary = SyncSummary::from_outcome(&PassOutcome::LoggedOut);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["outcome"], "logged_out");
        assert!(json.get("window_start").is_none());
    }
}
