//! # hcsync Testkit
//!
//! Test utilities for hcsync.
//!
//! This crate provides:
//! - Harnesses wiring mock services into a [`SyncContext`]
//! - Record and push message builders
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hcsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn uploads_steps() {
//!     let harness = TestHarness::new().logged_in();
//!     harness.store.seed(RecordType::Steps, [steps_record("a", fixed_now())]);
//!     harness.engine().run_pass_at(fixed_now()).await.unwrap();
//! }
//! ```
//!
//! [`SyncContext`]: hcsync_engine::SyncContext

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use hcsync_protocol::RecordType;
}

pub use fixtures::*;
pub use generators::*;
