//! Error types for store operations.

use hcsync_protocol::{AccessType, RecordType};
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Persisted state could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The device does not support this record type.
    #[error("record type {0} is not supported on this device")]
    Unsupported(RecordType),

    /// The user has not granted the needed access.
    #[error("{access:?} permission not granted for {record_type}")]
    PermissionDenied {
        /// Missing access kind.
        access: AccessType,
        /// Record type the access was needed for.
        record_type: RecordType,
    },

    /// A record was rejected by store validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No record with this identifier exists.
    #[error("no {record_type} record with id {id}")]
    NotFound {
        /// Record type searched.
        record_type: RecordType,
        /// Identifier searched.
        id: String,
    },
}

impl StorageError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if the error stems from device capability or user
    /// permission rather than a fault.
    pub fn is_capability_gap(&self) -> bool {
        matches!(
            self,
            StorageError::Unsupported(_) | StorageError::PermissionDenied { .. }
        )
    }
}
