//! HTTP client abstraction.
//!
//! The engine talks to the gateway through [`HttpClient`] so tests can swap
//! in [`MockHttpClient`]. [`ReqwestClient`] is the production
//! implementation.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// HTTP methods used by the gateway API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
    /// JSON body.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Creates a `POST` request with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            body: Some(body),
        }
    }

    /// Creates a `DELETE` request without a body.
    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    /// Attaches a bearer token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body.
    pub fn parse<T: DeserializeOwned>(&self) -> SyncResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP client abstraction.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status, and [`SyncError::Network`] when no response arrived.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> SyncResult<HttpResponse>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let mut builder = match request.method {
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        tracing::debug!(url = %request.url, status, "http response");
        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct MockRoute {
    method: Method,
    suffix: String,
    outcome: MockOutcome,
}

/// A scripted HTTP client for testing.
///
/// Routes match on method and URL suffix; the most recently added match
/// wins. Unmatched requests get `200 {"success": true}`. Every request is
/// recorded before it is answered.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
}

impl MockHttpClient {
    /// Creates a client answering every request with success.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answers requests matching `method` and `suffix` with `status` and
    /// `body`.
    pub fn respond(&self, method: Method, suffix: &str, status: u16, body: Value) {
        self.route(method, suffix, MockOutcome::Respond(HttpResponse::json(status, &body)));
    }

    /// Fails requests matching `method` and `suffix` as if the network
    /// were down.
    pub fn fail(&self, method: Method, suffix: &str, message: &str) {
        self.route(method, suffix, MockOutcome::Fail(message.to_string()));
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns the requests matching `method` and `suffix`.
    pub fn requests_to(&self, method: Method, suffix: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn route(&self, method: Method, suffix: &str, outcome: MockOutcome) {
        self.routes.lock().push(MockRoute {
            method,
            suffix: suffix.to_string(),
            outcome,
        });
    }

    fn outcome_for(&self, request: &HttpRequest) -> MockOutcome {
        self.routes
            .lock()
            .iter()
            .rev()
            .find(|r| r.method == request.method && request.url.ends_with(&r.suffix))
            .map(|r| r.outcome.clone())
            .unwrap_or_else(|| {
                MockOutcome::Respond(HttpResponse::json(200, &serde_json::json!({ "success": true })))
            })
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let outcome = self.outcome_for(&request);
        self.requests.lock().push(request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match outcome {
            MockOutcome::Respond(response) => Ok(response),
            MockOutcome::Fail(message) => Err(SyncError::Network(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_default_success() {
        let client = MockHttpClient::new();
        let response = client
            .send(HttpRequest::post("https://gw/api/v2/sync/steps", json!({})))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn mock_latest_route_wins() {
        let client = MockHttpClient::new();
        client.respond(Method::Post, "/login", 500, json!({ "error": "down" }));
        client.respond(Method::Post, "/login", 200, json!({ "token": "t", "refresh": "r" }));

        let response = client
            .send(HttpRequest::post("https://gw/api/v2/login", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn mock_routes_match_method() {
        let client = MockHttpClient::new();
        client.fail(Method::Delete, "/sync/steps", "unreachable");

        let post = client
            .send(HttpRequest::post("https://gw/api/v2/sync/steps", json!({})))
            .await;
        assert!(post.is_ok());

        let delete = client
            .send(HttpRequest::delete("https://gw/api/v2/sync/steps"))
            .await;
        assert!(matches!(delete, Err(SyncError::Network(_))));

        assert_eq!(client.requests_to(Method::Delete, "/sync/steps").len(), 1);
        client.clear_requests();
        assert!(client.requests().is_empty());
    }

    #[test]
    fn request_builders() {
        let request = HttpRequest::delete("https://gw/api/v2/revoke")
            .with_bearer("tok")
            .with_body(json!({ "uuid": ["a"] }));
        assert_eq!(request.method, Method::Delete);
        assert_eq!(request.bearer.as_deref(), Some("tok"));
        assert_eq!(request.body, Some(json!({ "uuid": ["a"] })));
    }

    #[test]
    fn response_parse() {
        let response = HttpResponse::json(403, &json!({ "error": "expired" }));
        assert!(!response.is_success());
        let body: hcsync_protocol::ErrorBody = response.parse().unwrap();
        assert_eq!(body.error, "expired");
    }
}
