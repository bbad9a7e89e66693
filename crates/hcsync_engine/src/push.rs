//! Server-originated push commands.

use crate::config::SettingsExt;
use crate::context::SyncContext;
use hcsync_protocol::{ProtocolError, PushCommand, PushMessage, RecordType, OP_INSERT};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Sending half of the push channel. Transports hold a clone.
pub type PushQueue = mpsc::Sender<PushMessage>;

/// Creates the push channel.
pub fn push_queue(capacity: usize) -> (PushQueue, mpsc::Receiver<PushMessage>) {
    mpsc::channel(capacity.max(1))
}

/// Applies push commands to the device store.
///
/// Every message is handled as if the process had just started: the store
/// is re-initialized and settings are reloaded. Failures never propagate;
/// insert failures raise one alert, everything else is logged.
#[derive(Debug, Clone)]
pub struct PushHandler {
    ctx: SyncContext,
}

impl PushHandler {
    /// Creates a handler.
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Handles one message.
    pub async fn handle(&self, message: &PushMessage) {
        if let Err(e) = self.ctx.store.initialize() {
            warn!(error = %e, "health store initialization failed");
        }

        let command = match PushCommand::decode(message) {
            Ok(command) => command,
            Err(ProtocolError::UnknownOp(op)) => {
                warn!(%op, "ignoring push message with unknown op");
                return;
            }
            Err(e) if message.op == OP_INSERT => {
                let label = message
                    .record_type_hint()
                    .unwrap_or_else(|| "unknown".to_string());
                self.insert_failed(&label, &e.to_string());
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed delete command");
                return;
            }
        };

        match command {
            PushCommand::Insert {
                record_type,
                records,
            } => match self.ctx.store.insert_records(&records) {
                Ok(ids) => info!(record_type = %record_type, count = ids.len(), "pushed records inserted"),
                Err(e) => self.insert_failed(record_type.as_str(), &e.to_string()),
            },
            PushCommand::Delete { record_type, uuids } => self.delete(record_type, &uuids).await,
        }
    }

    fn insert_failed(&self, record_type: &str, message: &str) {
        warn!(%record_type, error = %message, "push insert failed");
        self.ctx.notifier.alert(
            &format!("Push failed for {record_type}"),
            &format!("Error: {message}"),
        );
    }

    /// Local and remote deletes are independent; neither waits on the
    /// other's success.
    async fn delete(&self, record_type: RecordType, uuids: &[String]) {
        match self.ctx.store.delete_records(record_type, uuids) {
            Ok(removed) => info!(record_type = %record_type, removed, "pushed delete applied"),
            Err(e) => warn!(record_type = %record_type, error = %e, "local delete failed"),
        }

        let settings = match self.ctx.settings.load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "could not load settings, skipping remote delete");
                return;
            }
        };
        let Some(token) = settings.credentials.access_token else {
            warn!(record_type = %record_type, "not logged in, skipping remote delete");
            return;
        };

        match self
            .ctx
            .remote(&settings.base_url)
            .delete(record_type, &token, uuids)
            .await
        {
            Ok(()) => debug!(record_type = %record_type, count = uuids.len(), "remote delete sent"),
            Err(e) => warn!(record_type = %record_type, error = %e, "remote delete failed"),
        }
    }
}

/// Handles messages one at a time until every sender is dropped or
/// `shutdown` turns true.
///
/// A message already being handled is always finished.
pub async fn run_push_loop(
    handler: PushHandler,
    mut receiver: mpsc::Receiver<PushMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow_and_update() {
            break;
        }
        tokio::select! {
            message = receiver.recv() => match message {
                Some(message) => handler.handle(&message).await,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // No shutdown can arrive any more.
                    while let Some(message) = receiver.recv().await {
                        handler.handle(&message).await;
                    }
                    break;
                }
            }
        }
    }
    debug!("push loop stopped");
}
