//! REST request and response bodies.

use crate::record::HealthRecord;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v2/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account name. Unknown accounts are created on first login.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Push-messaging device token, so the server can address this device.
    #[serde(rename = "fcmToken", skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

/// Body of `POST /api/v2/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token to exchange.
    pub refresh: String,
}

/// An access/refresh token pair issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer token.
    #[serde(rename = "token")]
    pub access_token: String,
    /// Long-lived token exchanged for a new pair.
    #[serde(rename = "refresh")]
    pub refresh_token: String,
    /// Access token expiry as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

/// Response of the login and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthResponse {
    /// Tokens were issued.
    Granted(TokenPair),
    /// The server refused, with a reason.
    Denied {
        /// Server-provided reason.
        error: String,
    },
}

/// Generic `{error}` body returned by failing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Server-provided reason.
    pub error: String,
}

/// Payload of an upload: one detailed record or a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadData {
    /// A single record fetched individually.
    One(HealthRecord),
    /// All records of one type.
    Many(Vec<HealthRecord>),
}

impl UploadData {
    /// Number of records carried.
    pub fn len(&self) -> usize {
        match self {
            UploadData::One(_) => 1,
            UploadData::Many(records) => records.len(),
        }
    }

    /// Returns true if no records are carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body of `POST /api/v2/sync/{recordType}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBody {
    /// Records to store.
    pub data: UploadData,
}

/// Body of `DELETE /api/v2/sync/{recordType}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBody {
    /// Identifiers to remove.
    pub uuid: Vec<String>,
}
