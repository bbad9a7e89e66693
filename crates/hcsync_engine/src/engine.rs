//! The sync pass.

use crate::config::SettingsExt;
use crate::context::SyncContext;
use crate::error::SyncResult;
use crate::notify::StatusLevel;
use crate::progress::ProgressCounter;
use crate::remote::RemoteClient;
use crate::window::resolve_window;
use chrono::{DateTime, Utc};
use hcsync_protocol::{HealthRecord, RecordType, TimeRange, UploadData};
use hcsync_storage::LockFile;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Statistics about sync passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes that ran to completion.
    pub passes_completed: u64,
    /// Passes refused because another was running.
    pub passes_skipped: u64,
    /// Records accepted by the server.
    pub records_uploaded: u64,
    /// Records whose upload failed.
    pub upload_failures: u64,
    /// Start time of the last completed pass.
    pub last_pass: Option<DateTime<Utc>>,
    /// Last error that aborted a pass.
    pub last_error: Option<String>,
}

/// Summary of one completed pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// When the pass started; also the new cursor.
    pub started_at: DateTime<Utc>,
    /// Window that was read.
    pub window: TimeRange,
    /// Records fetched across all types.
    pub fetched: usize,
    /// Records the server accepted.
    pub uploaded: usize,
    /// Records whose detail read or upload failed.
    pub upload_failures: usize,
    /// Types whose fetch failed and were skipped.
    pub skipped_types: Vec<RecordType>,
    /// Final progress.
    pub progress: ProgressCounter,
}

/// What [`SyncEngine::run_pass`] did.
#[derive(Debug, Clone)]
pub enum PassOutcome {
    /// The pass ran.
    Completed(PassReport),
    /// No access token is stored; nothing was touched.
    LoggedOut,
    /// Another pass was in progress; nothing was touched.
    AlreadyRunning,
}

impl PassOutcome {
    /// Returns the report of a completed pass.
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Clears the in-progress flag when the pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Uploads device records to the server.
///
/// # Invariants
///
/// - At most one pass runs at a time per engine, and per lock file when
///   [`EngineConfig::pass_lock`](crate::EngineConfig::pass_lock) is set
/// - The cursor is persisted before the first upload
/// - A failing record type never aborts the pass
pub struct SyncEngine {
    ctx: SyncContext,
    running: AtomicBool,
    stats: RwLock<SyncStats>,
}

impl SyncEngine {
    /// Creates an engine.
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            running: AtomicBool::new(false),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the engine's services.
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns true while a pass is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one pass starting now.
    pub async fn run_pass(&self) -> SyncResult<PassOutcome> {
        self.run_pass_at(Utc::now()).await
    }

    /// Runs one pass as if it started at `now`.
    ///
    /// # Errors
    ///
    /// Only settings-store failures abort a pass. Fetch and upload failures
    /// are logged and counted in the report.
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> SyncResult<PassOutcome> {
        let Some(_guard) = PassGuard::acquire(&self.running) else {
            debug!("sync pass already in progress");
            self.stats.write().passes_skipped += 1;
            return Ok(PassOutcome::AlreadyRunning);
        };
        let _lock = match &self.ctx.config.pass_lock {
            Some(path) => match LockFile::try_acquire(path)? {
                Some(lock) => Some(lock),
                None => {
                    debug!(path = %path.display(), "sync pass running in another process");
                    self.stats.write().passes_skipped += 1;
                    return Ok(PassOutcome::AlreadyRunning);
                }
            },
            None => None,
        };

        let result = self.pass(now).await;
        if let Err(e) = &result {
            self.stats.write().last_error = Some(e.to_string());
        }
        result
    }

    async fn pass(&self, now: DateTime<Utc>) -> SyncResult<PassOutcome> {
        let settings = self.ctx.settings.load_settings()?;
        let Some(token) = settings.credentials.access_token else {
            debug!("not logged in, skipping sync pass");
            return Ok(PassOutcome::LoggedOut);
        };

        let window = resolve_window(&settings.sync, settings.cursor, now);
        self.ctx.settings.save_cursor(now)?;

        info!(start = %window.start(), end = %window.end(), "sync pass started");
        self.ctx.notifier.status(StatusLevel::Info, "Syncing data...");

        if let Err(e) = self.ctx.store.initialize() {
            warn!(error = %e, "health store initialization failed");
        }

        let mut batches = Vec::new();
        let mut skipped_types = Vec::new();
        for &record_type in &self.ctx.config.record_types {
            match self.ctx.store.read_records(record_type, &window) {
                Ok(records) => batches.push((record_type, records)),
                Err(e) => {
                    debug!(record_type = %record_type, error = %e, "skipping record type");
                    skipped_types.push(record_type);
                }
            }
        }

        let fetched = batches.iter().map(|(_, records)| records.len()).sum();
        let mut upload = Upload {
            ctx: &self.ctx,
            remote: self.ctx.remote(&settings.base_url),
            token,
            progress: ProgressCounter::new(fetched),
            uploaded: 0,
            failed: 0,
        };
        self.ctx.notifier.progress(upload.progress);

        for (record_type, records) in batches {
            if records.is_empty() {
                continue;
            }
            if record_type.requires_detail() {
                upload.details(record_type, &records).await;
            } else {
                upload.batch(record_type, records).await;
            }
        }

        let report = PassReport {
            started_at: now,
            window,
            fetched,
            uploaded: upload.uploaded,
            upload_failures: upload.failed,
            skipped_types,
            progress: upload.progress,
        };

        {
            let mut stats = self.stats.write();
            stats.passes_completed += 1;
            stats.records_uploaded += report.uploaded as u64;
            stats.upload_failures += report.upload_failures as u64;
            stats.last_pass = Some(now);
            stats.last_error = None;
        }

        info!(
            fetched = report.fetched,
            uploaded = report.uploaded,
            failed = report.upload_failures,
            skipped = report.skipped_types.len(),
            "sync pass finished"
        );
        Ok(PassOutcome::Completed(report))
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Upload state for one pass.
struct Upload<'a> {
    ctx: &'a SyncContext,
    remote: RemoteClient,
    token: String,
    progress: ProgressCounter,
    uploaded: usize,
    failed: usize,
}

impl Upload<'_> {
    /// Posts a whole type in one request.
    async fn batch(&mut self, record_type: RecordType, records: Vec<HealthRecord>) {
        let count = records.len();
        match self
            .remote
            .upload(record_type, &self.token, UploadData::Many(records))
            .await
        {
            Ok(()) => self.uploaded += count,
            Err(e) => {
                warn!(record_type = %record_type, count, error = %e, "upload failed");
                self.failed += count;
            }
        }
        self.step(count);
    }

    /// Re-reads each record with its details and posts it alone, pausing
    /// between records.
    async fn details(&mut self, record_type: RecordType, records: &[HealthRecord]) {
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.ctx.config.detail_delay).await;
            }

            match self.detail(record_type, record).await {
                Ok(()) => self.uploaded += 1,
                Err(message) => {
                    warn!(record_type = %record_type, error = %message, "detail upload failed");
                    self.failed += 1;
                }
            }
            self.step(1);
        }
    }

    async fn detail(&self, record_type: RecordType, record: &HealthRecord) -> Result<(), String> {
        let id = record.id().ok_or("record has no id")?;
        let detailed = self
            .ctx
            .store
            .read_record(record_type, id)
            .map_err(|e| e.to_string())?;
        self.remote
            .upload(record_type, &self.token, UploadData::One(detailed))
            .await
            .map_err(|e| e.to_string())
    }

    fn step(&mut self, count: usize) {
        self.progress.advance(count);
        self.ctx.notifier.progress(self.progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = PassGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(PassGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(PassGuard::acquire(&flag).is_some());
    }

    #[test]
    fn outcome_report() {
        assert!(PassOutcome::LoggedOut.report().is_none());
        assert!(PassOutcome::AlreadyRunning.report().is_none());
    }
}
