//! Error types for the sync engine.

use hcsync_protocol::ProtocolError;
use hcsync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Credentials were rejected or have expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided reason, or the raw body.
        message: String,
    },

    /// Local store failure.
    #[error("store error: {0}")]
    Store(#[from] StorageError),

    /// Malformed record or message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No access token is stored.
    #[error("not logged in")]
    NotLoggedIn,
}

impl SyncError {
    /// Returns true if the error means the session is no longer valid.
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_) | SyncError::NotLoggedIn)
    }

    /// Returns true if the error came from talking to the server.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::Auth(_) | SyncError::Network(_) | SyncError::Server { .. }
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Protocol(ProtocolError::Json(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcsync_protocol::RecordType;

    #[test]
    fn error_classes() {
        assert!(SyncError::Auth("expired".into()).is_auth());
        assert!(SyncError::NotLoggedIn.is_auth());
        assert!(!SyncError::Network("reset".into()).is_auth());

        assert!(SyncError::Network("reset".into()).is_remote());
        assert!(SyncError::Server {
            status: 500,
            message: "boom".into()
        }
        .is_remote());
        assert!(!SyncError::Store(StorageError::Unsupported(RecordType::Steps)).is_remote());
    }

    #[test]
    fn error_display() {
        let err = SyncError::Server {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "server error (502): bad gateway");
        assert_eq!(SyncError::NotLoggedIn.to_string(), "not logged in");
    }
}
