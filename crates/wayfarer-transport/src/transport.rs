//! The HTTP boundary.
//!
//! The pipeline talks to the network through the [`HttpTransport`] trait so
//! that every policy above it (credential attachment, status dispatch,
//! failover) can be exercised against the mock in [`crate::test_utils`].
//! [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Default connection/read timeout for the underlying HTTP client. The
/// per-entity watchdogs in the fetcher are tighter; this is the transport's
/// own backstop.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A network-level failure: no HTTP response was received.
#[derive(Debug, Clone, Error)]
#[error("network failure: {0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One outbound call, relative to the active base endpoint.
///
/// `path` must start with `/` and may carry a query string.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Bearer token attached by the request-phase interceptor.
    pub bearer: Option<String>,
    /// Requests issued from login/registration screens suppress the
    /// session-expired redirect on 401.
    pub from_auth_page: bool,
    /// Set once the request has been re-issued after a failover; at most one
    /// failover attempt is allowed per request.
    pub retried: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::build(Method::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::build(Method::Post, path, Some(body))
    }

    /// POST with no body (action endpoints like refresh or favorite).
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self::build(Method::Post, path, None)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::build(Method::Put, path, Some(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::build(Method::Delete, path, None)
    }

    /// Mark this request as originating from an auth screen.
    pub fn on_auth_page(mut self) -> Self {
        self.from_auth_page = true;
        self
    }

    fn build(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            bearer: None,
            from_auth_page: false,
            retried: false,
        }
    }

    /// Routing key used by the mock transport: `"GET /tours/42"`.
    pub fn route(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

/// The raw response: status plus the parsed JSON body (`Null` when the body
/// is empty or not JSON).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a request against `base`. `Err` means no response was received;
    /// every received response, whatever its status, is `Ok`.
    async fn send(&self, base: &str, req: &ApiRequest) -> Result<ApiResponse, TransportError>;

    /// Lightweight health check against `base`, bounded by `timeout`.
    async fn probe(&self, base: &str, timeout: Duration) -> bool;
}

/// Production transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, base: &str, req: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", base.trim_end_matches('/'), req.path);
        let mut builder = match req.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };

        builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(ApiResponse { status, body })
    }

    async fn probe(&self, base: &str, timeout: Duration) -> bool {
        let url = format!("{}/health", base.trim_end_matches('/'));
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_includes_method_and_path() {
        let req = ApiRequest::get("/tours/42?full=1");
        assert_eq!(req.route(), "GET /tours/42?full=1");
        assert_eq!(ApiRequest::delete("/x").route(), "DELETE /x");
    }

    #[test]
    fn builders_start_unauthenticated_and_unretried() {
        let req = ApiRequest::post("/auth/login", serde_json::json!({}));
        assert!(req.bearer.is_none());
        assert!(!req.retried);
        assert!(!req.from_auth_page);
        assert!(req.on_auth_page().from_auth_page);
    }
}
