//! CLI command implementations.

pub mod config;
pub mod login;
pub mod logout;
pub mod run;
pub mod sync;

use hcsync_engine::{EngineConfig, ReqwestClient, SyncContext, TracingNotifier};
use hcsync_storage::{FileHealthStore, FileSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SETTINGS_FILE: &str = "settings.json";
const HEALTH_FILE: &str = "health.json";
const PASS_LOCK_FILE: &str = "sync.lock";

/// Returns `<platform data dir>/hcsync`.
pub fn default_data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base = dirs::data_dir().ok_or("No data directory on this platform; pass --data-dir")?;
    Ok(base.join("hcsync"))
}

/// Opens the settings file in `data_dir`, creating the directory if needed.
pub fn open_settings(data_dir: &Path) -> Result<FileSettings, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;
    Ok(FileSettings::open(&data_dir.join(SETTINGS_FILE))?)
}

/// Wires the file stores, the HTTP client and a logging notifier.
pub fn open_context(data_dir: &Path) -> Result<SyncContext, Box<dyn std::error::Error>> {
    let settings = open_settings(data_dir)?;
    let store = FileHealthStore::open(&data_dir.join(HEALTH_FILE))?;
    let config = EngineConfig::default().with_pass_lock(data_dir.join(PASS_LOCK_FILE));
    let http = ReqwestClient::new(config.request_timeout)?;
    let ctx = SyncContext::new(
        Arc::new(store),
        Arc::new(settings),
        Arc::new(http),
        Arc::new(TracingNotifier),
    )
    .with_config(config);
    tracing::debug!(data_dir = %data_dir.display(), "opened data directory");
    Ok(ctx)
}
