//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding records and messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A record type name outside the canonical set.
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    /// A push message with an unrecognised `op` tag.
    #[error("unknown push operation: {0}")]
    UnknownOp(String),

    /// An insert command carried no records.
    #[error("insert command contains no records")]
    EmptyInsert,

    /// The first record of an insert command has no `recordType`.
    #[error("insert command is missing recordType")]
    MissingRecordType,

    /// A record payload was not a JSON object.
    #[error("record payload is not a JSON object")]
    NotAnObject,

    /// A timestamp that is not valid RFC 3339.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A time range whose start is after its end.
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start.
        start: String,
        /// Requested end.
        end: String,
    },

    /// Malformed JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
