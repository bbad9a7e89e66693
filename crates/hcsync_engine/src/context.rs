//! Shared services handed to every engine task.

use crate::config::EngineConfig;
use crate::http::HttpClient;
use crate::notify::Notifier;
use crate::remote::RemoteClient;
use hcsync_storage::{HealthStore, SettingsStore};
use std::fmt;
use std::sync::Arc;

/// The collaborators a sync pass, push handler or session routine needs.
///
/// Cloning is cheap; every service sits behind an `Arc`.
#[derive(Clone)]
pub struct SyncContext {
    /// Tuning constants.
    pub config: EngineConfig,
    /// Device health store.
    pub store: Arc<dyn HealthStore>,
    /// Durable settings.
    pub settings: Arc<dyn SettingsStore>,
    /// HTTP transport.
    pub http: Arc<dyn HttpClient>,
    /// User-facing notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl SyncContext {
    /// Creates a context with the default [`EngineConfig`].
    pub fn new(
        store: Arc<dyn HealthStore>,
        settings: Arc<dyn SettingsStore>,
        http: Arc<dyn HttpClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config: EngineConfig::default(),
            store,
            settings,
            http,
            notifier,
        }
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a REST client for the server at `base_url`.
    pub fn remote(&self, base_url: &str) -> RemoteClient {
        RemoteClient::new(Arc::clone(&self.http), base_url)
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
