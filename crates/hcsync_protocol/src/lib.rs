//! # hcsync Protocol
//!
//! Record model and wire types shared by the hcsync crates.
//!
//! This crate provides:
//! - [`RecordType`], the fixed set of canonical health record types
//! - [`HealthRecord`], a provider-defined JSON record with a stable id
//! - [`TimeRange`] for windowed store queries
//! - [`PushCommand`] decoding of inbound push messages
//! - REST request and response bodies for the gateway API
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod messages;
mod record;
mod record_type;
mod time_range;

pub use command::{PushCommand, PushMessage, OP_DELETE, OP_INSERT};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    AuthResponse, DeleteBody, ErrorBody, LoginRequest, RefreshRequest, TokenPair, UploadBody,
    UploadData,
};
pub use record::HealthRecord;
pub use record_type::{AccessType, Permission, RecordType};
pub use time_range::TimeRange;
