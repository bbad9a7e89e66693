//! # hcsync Storage
//!
//! Local state for the hcsync gateway.
//!
//! This crate provides the two stores the sync engine works against:
//!
//! - [`HealthStore`]: capability-gated access to device-resident health
//!   records, keyed by record type and time range
//! - [`SettingsStore`]: a durable string key/value store for credentials,
//!   the sync cursor and user configuration
//!
//! ## Design Principles
//!
//! - Stores serialize their own writes; callers never lock around them
//! - Writes to the same record id are last-write-wins
//! - Must be `Send + Sync` so the sync pass and push handler can share them
//!
//! ## Available Stores
//!
//! - [`InMemoryHealthStore`] / [`InMemorySettings`] - For testing
//! - [`FileHealthStore`] / [`FileSettings`] - JSON files that survive restarts
//!
//! [`LockFile`] is the advisory lock the file stores write under; hosts use
//! it to keep processes sharing a data directory from overlapping.
//!
//! ## Example
//!
//! ```rust
//! use hcsync_storage::{InMemorySettings, SettingsStore};
//!
//! let settings = InMemorySettings::new();
//! settings.set("syncPeriodDays", "7").unwrap();
//! assert_eq!(settings.get("syncPeriodDays").unwrap().as_deref(), Some("7"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod health;
mod memory;
mod settings;

pub use error::{StorageError, StorageResult};
pub use file::{FileHealthStore, LockFile};
pub use health::{validate_record, HealthStore};
pub use memory::InMemoryHealthStore;
pub use settings::{FileSettings, InMemorySettings, SettingsStore};
