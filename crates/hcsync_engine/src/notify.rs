//! User-facing notifications.
//!
//! The engine reports through a [`Notifier`] so that the host decides how
//! messages are shown: toasts and a foreground notification on a phone,
//! log lines in the command-line host.

use crate::progress::ProgressCounter;
use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Message shown by the progress notification once a pass has finished.
pub const IDLE_MESSAGE: &str = "Working in the background to sync your data.";

/// Severity of a transient status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// Neutral information.
    Info,
    /// An action succeeded.
    Success,
    /// An action failed.
    Error,
}

/// Sink for user-facing messages.
pub trait Notifier: Send + Sync {
    /// Shows a transient status message.
    fn status(&self, level: StatusLevel, message: &str);

    /// Raises a persistent alert that stays until the user dismisses it.
    fn alert(&self, title: &str, body: &str);

    /// Updates the sync progress display.
    ///
    /// A complete counter means the pass is done and the display should
    /// return to [`IDLE_MESSAGE`].
    fn progress(&self, progress: ProgressCounter);
}

/// A [`Notifier`] that writes everything to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn status(&self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Info | StatusLevel::Success => info!("{message}"),
            StatusLevel::Error => warn!("{message}"),
        }
    }

    fn alert(&self, title: &str, body: &str) {
        error!(%title, %body, "alert");
    }

    fn progress(&self, progress: ProgressCounter) {
        if progress.is_complete() {
            info!("{IDLE_MESSAGE}");
        } else {
            info!(percent = progress.percent(), "syncing... [{progress}]");
        }
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A status message.
    Status {
        /// Severity.
        level: StatusLevel,
        /// Text.
        message: String,
    },
    /// A persistent alert.
    Alert {
        /// Title.
        title: String,
        /// Body.
        body: String,
    },
    /// A progress update.
    Progress(ProgressCounter),
}

/// A [`Notifier`] that records every call, for testing.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notification in order.
    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().clone()
    }

    /// Returns `(title, body)` of every alert.
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Notification::Alert { title, body } => Some((title.clone(), body.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns the text of every status message.
    pub fn statuses(&self) -> Vec<(StatusLevel, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Notification::Status { level, message } => Some((*level, message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns every progress update.
    pub fn progress_updates(&self) -> Vec<ProgressCounter> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Notification::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Forgets recorded notifications.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn status(&self, level: StatusLevel, message: &str) {
        self.events.lock().push(Notification::Status {
            level,
            message: message.to_string(),
        });
    }

    fn alert(&self, title: &str, body: &str) {
        self.events.lock().push(Notification::Alert {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn progress(&self, progress: ProgressCounter) {
        self.events.lock().push(Notification::Progress(progress));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_filters_by_kind() {
        let notifier = RecordingNotifier::new();
        notifier.status(StatusLevel::Info, "Syncing data...");
        notifier.alert("Push failed for Steps", "Error: boom");
        notifier.progress(ProgressCounter::new(2));

        assert_eq!(notifier.events().len(), 3);
        assert_eq!(
            notifier.alerts(),
            vec![("Push failed for Steps".to_string(), "Error: boom".to_string())]
        );
        assert_eq!(
            notifier.statuses(),
            vec![(StatusLevel::Info, "Syncing data...".to_string())]
        );
        assert_eq!(notifier.progress_updates(), vec![ProgressCounter::new(2)]);

        notifier.clear();
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn tracing_notifier_accepts_everything() {
        let notifier = TracingNotifier;
        notifier.status(StatusLevel::Error, "Login failed");
        notifier.alert("title", "body");
        notifier.progress(ProgressCounter::new(0));
    }
}
