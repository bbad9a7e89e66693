//! Background task scheduling.
//!
//! Three independent tokio tasks:
//! - the sync loop, firing a pass every sync interval or on demand
//! - the refresh loop, exchanging tokens every refresh interval
//! - the push loop, when a push receiver is supplied
//!
//! Each loop runs its work inline, so a slow pass delays only the next
//! pass, never a token refresh.

use crate::config::SettingsExt;
use crate::context::SyncContext;
use crate::engine::{PassOutcome, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::push::{run_push_loop, PushHandler};
use crate::session::{RefreshOutcome, Session};
use hcsync_protocol::PushMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Builds and starts the background tasks.
#[derive(Debug)]
pub struct Scheduler {
    ctx: SyncContext,
    push: Option<mpsc::Receiver<PushMessage>>,
}

impl Scheduler {
    /// Creates a scheduler without push handling.
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx, push: None }
    }

    /// Also runs a push loop fed by `receiver`.
    pub fn with_push_receiver(mut self, receiver: mpsc::Receiver<PushMessage>) -> Self {
        self.push = Some(receiver);
        self
    }

    /// Spawns the loops on the current tokio runtime.
    ///
    /// The sync interval is read from settings once here; later changes go
    /// through [`SchedulerHandle::set_sync_interval`]. No pass runs at
    /// startup.
    pub fn start(self) -> SyncResult<SchedulerHandle> {
        let settings = self.ctx.settings.load_settings()?;
        let interval = settings.sync_interval_or(self.ctx.config.default_sync_interval);

        let (interval_tx, interval_rx) = watch::channel(interval);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());
        let engine = Arc::new(SyncEngine::new(self.ctx.clone()));

        let mut tasks = vec![
            tokio::spawn(sync_loop(
                Arc::clone(&engine),
                interval_rx,
                Arc::clone(&trigger),
                shutdown_rx.clone(),
            )),
            tokio::spawn(refresh_loop(
                Session::new(self.ctx.clone()),
                self.ctx.config.refresh_interval,
                shutdown_rx.clone(),
            )),
        ];
        if let Some(receiver) = self.push {
            tasks.push(tokio::spawn(run_push_loop(
                PushHandler::new(self.ctx.clone()),
                receiver,
                shutdown_rx,
            )));
        }

        info!(
            sync_interval = ?interval,
            refresh_interval = ?self.ctx.config.refresh_interval,
            "scheduler started"
        );

        Ok(SchedulerHandle {
            ctx: self.ctx,
            engine,
            interval: interval_tx,
            trigger,
            shutdown: shutdown_tx,
            tasks,
        })
    }
}

/// Controls running background tasks.
#[derive(Debug)]
pub struct SchedulerHandle {
    ctx: SyncContext,
    engine: Arc<SyncEngine>,
    interval: watch::Sender<Duration>,
    trigger: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Returns the engine the sync loop drives.
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Returns the current sync interval.
    pub fn sync_interval(&self) -> Duration {
        *self.interval.borrow()
    }

    /// Persists a new sync interval and restarts the sync timer with it.
    pub fn set_sync_interval(&self, interval: Duration) -> SyncResult<()> {
        if interval.is_zero() {
            return Err(SyncError::Config("sync interval must be positive".into()));
        }
        self.ctx.settings.save_sync_interval(interval)?;
        self.interval.send_replace(interval);
        info!(?interval, "sync interval changed");
        Ok(())
    }

    /// Requests a pass now. Requests made during a pass run one more pass
    /// after it.
    pub fn trigger_sync(&self) {
        self.trigger.notify_one();
    }

    /// Stops every loop after its current iteration and waits for them.
    ///
    /// Dropping the handle also stops the loops, without waiting.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        info!("scheduler stopped");
    }
}

async fn sync_loop(
    engine: Arc<SyncEngine>,
    mut interval: watch::Receiver<Duration>,
    trigger: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let period = *interval.borrow_and_update();
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = trigger.notified() => debug!("sync requested"),
            changed = interval.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }

        match engine.run_pass().await {
            Ok(PassOutcome::Completed(report)) => debug!(
                uploaded = report.uploaded,
                progress = %report.progress,
                "scheduled pass completed"
            ),
            Ok(PassOutcome::LoggedOut) => debug!("scheduled pass skipped, logged out"),
            Ok(PassOutcome::AlreadyRunning) => debug!("scheduled pass skipped, already running"),
            Err(e) => error!(error = %e, "sync pass failed"),
        }
    }
    debug!("sync loop stopped");
}

async fn refresh_loop(session: Session, period: Duration, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *shutdown.borrow() {
            break;
        }

        match session.refresh().await {
            Ok(RefreshOutcome::Refreshed) => debug!("scheduled token refresh completed"),
            Ok(RefreshOutcome::NoRefreshToken) => debug!("scheduled refresh skipped, no token"),
            Err(e) => warn!(error = %e, "scheduled token refresh failed"),
        }
    }
    debug!("refresh loop stopped");
}
