//! # hcsync Engine
//!
//! Background synchronization between a device health store and the
//! gateway server.
//!
//! This crate provides:
//! - The sync pass (window resolution, per-type fetch, batched and
//!   staggered upload, progress, cursor advancement)
//! - The push command handler and its channel-fed loop
//! - Session routines (login, logout, token refresh)
//! - A tokio scheduler running sync and refresh on independent intervals
//! - The HTTP client seam and the gateway REST client
//!
//! ## Architecture
//!
//! Every task reloads its configuration from the [`SettingsStore`] when it
//! starts, so there is no process-wide mutable configuration:
//!
//! 1. The scheduler fires a sync pass
//! 2. The pass snapshots [`Settings`], persists the new cursor, then reads
//!    each record type from the [`HealthStore`]
//! 3. Records are uploaded through [`RemoteClient`]
//!
//! Push commands arrive on an mpsc channel and are handled one at a time,
//! concurrently with sync passes.
//!
//! ## Key Invariants
//!
//! - No pass runs while logged out
//! - At most one pass runs at a time
//! - One record type failing never aborts the pass
//! - The cursor is written before any upload starts
//!
//! [`SettingsStore`]: hcsync_storage::SettingsStore
//! [`HealthStore`]: hcsync_storage::HealthStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod engine;
mod error;
mod http;
mod notify;
mod progress;
mod push;
mod remote;
mod scheduler;
mod session;
mod window;

pub use config::{
    keys, Credentials, EngineConfig, RangeMode, Settings, SettingsExt, SyncConfig, SyncMode,
    DEFAULT_BASE_URL,
};
pub use context::SyncContext;
pub use engine::{PassOutcome, PassReport, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, MockHttpClient, ReqwestClient};
pub use notify::{
    Notification, Notifier, RecordingNotifier, StatusLevel, TracingNotifier, IDLE_MESSAGE,
};
pub use progress::ProgressCounter;
pub use push::{push_queue, run_push_loop, PushHandler, PushQueue};
pub use remote::RemoteClient;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use session::{RefreshOutcome, Session};
pub use window::resolve_window;
