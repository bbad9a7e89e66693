//! Gateway REST client.

use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use hcsync_protocol::{
    AuthResponse, DeleteBody, ErrorBody, LoginRequest, RecordType, RefreshRequest, TokenPair,
    UploadBody, UploadData,
};
use std::sync::Arc;
use tracing::debug;

/// Typed client for the gateway's `/api/v2` endpoints.
///
/// Status mapping:
/// - 2xx is success
/// - 401 and 403 become [`SyncError::Auth`]
/// - anything else becomes [`SyncError::Server`]
/// - an `{error}` body from login or refresh becomes [`SyncError::Auth`]
#[derive(Clone)]
pub struct RemoteClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl RemoteClient {
    /// Creates a client for the server at `base_url`.
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL of an API endpoint.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, endpoint)
    }

    /// Exchanges a username and password for a token pair.
    pub async fn login(&self, request: &LoginRequest) -> SyncResult<TokenPair> {
        let body = serde_json::to_value(request)?;
        self.exchange(HttpRequest::post(self.url("login"), body)).await
    }

    /// Exchanges a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> SyncResult<TokenPair> {
        let body = serde_json::to_value(RefreshRequest {
            refresh: refresh_token.to_string(),
        })?;
        self.exchange(HttpRequest::post(self.url("refresh"), body)).await
    }

    /// Uploads records of one type.
    pub async fn upload(
        &self,
        record_type: RecordType,
        token: &str,
        data: UploadData,
    ) -> SyncResult<()> {
        let count = data.len();
        let body = serde_json::to_value(UploadBody { data })?;
        let request = HttpRequest::post(self.url(&sync_endpoint(record_type)), body)
            .with_bearer(token);
        check(self.http.send(request).await?)?;
        debug!(record_type = %record_type, count, "uploaded records");
        Ok(())
    }

    /// Deletes records of one type on the server.
    pub async fn delete(
        &self,
        record_type: RecordType,
        token: &str,
        uuids: &[String],
    ) -> SyncResult<()> {
        let body = serde_json::to_value(DeleteBody {
            uuid: uuids.to_vec(),
        })?;
        let request = HttpRequest::delete(self.url(&sync_endpoint(record_type)))
            .with_bearer(token)
            .with_body(body);
        check(self.http.send(request).await?)?;
        Ok(())
    }

    /// Revokes an access token.
    pub async fn revoke(&self, token: &str) -> SyncResult<()> {
        let request = HttpRequest::delete(self.url("revoke")).with_bearer(token);
        check(self.http.send(request).await?)?;
        Ok(())
    }

    async fn exchange(&self, request: HttpRequest) -> SyncResult<TokenPair> {
        let response = self.http.send(request).await?;
        if let Ok(AuthResponse::Denied { error }) = response.parse::<AuthResponse>() {
            return Err(SyncError::Auth(error));
        }
        match check(response)?.parse::<AuthResponse>()? {
            AuthResponse::Granted(tokens) => Ok(tokens),
            AuthResponse::Denied { error } => Err(SyncError::Auth(error)),
        }
    }
}

fn sync_endpoint(record_type: RecordType) -> String {
    format!("sync/{}", record_type.as_str())
}

fn check(response: HttpResponse) -> SyncResult<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = response
        .parse::<ErrorBody>()
        .map(|b| b.error)
        .unwrap_or_else(|_| response.body.clone());
    match response.status {
        401 | 403 => Err(SyncError::Auth(message)),
        status => Err(SyncError::Server { status, message }),
    }
}
