//! The API client facade.
//!
//! [`ApiClient`] is what the rest of the application talks to: JSON verbs
//! that run every call through the interceptor pipeline, delegate
//! network-level failures to the failover controller, and keep the
//! credential store honest. One instance is shared by every page.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use wayfarer_types::credential::Credential;
use wayfarer_types::error::ApiError;

use crate::failover::{EndpointState, FailoverController};
use crate::interceptor::Interceptors;
use crate::notice::{LogNoticeSink, Notice, NoticeSink};
use crate::store::CredentialStore;
use crate::token::{self, TokenManager};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};

pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    endpoints: Arc<EndpointState>,
    store: Arc<CredentialStore>,
    interceptors: Interceptors,
    failover: FailoverController,
    notices: Arc<dyn NoticeSink>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<CredentialStore>,
        endpoints: Arc<EndpointState>,
        notices: Arc<dyn NoticeSink>,
    ) -> Arc<Self> {
        let tokens = TokenManager::new(transport.clone(), endpoints.clone(), store.clone());
        let interceptors = Interceptors::new(store.clone(), tokens, notices.clone());
        let failover = FailoverController::new(transport.clone(), endpoints.clone());
        Arc::new(Self {
            transport,
            endpoints,
            store,
            interceptors,
            failover,
            notices,
        })
    }

    /// Client wired for production use: reqwest transport, env-resolved
    /// endpoints, notices forwarded to the log.
    pub fn from_env(store: Arc<CredentialStore>) -> Arc<Self> {
        Self::new(
            Arc::new(ReqwestTransport::new()),
            store,
            Arc::new(EndpointState::from_env()),
            Arc::new(LogNoticeSink),
        )
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn endpoints(&self) -> &Arc<EndpointState> {
        &self.endpoints
    }

    pub fn notices(&self) -> Arc<dyn NoticeSink> {
        self.notices.clone()
    }

    /// Force a token refresh outside the request phase (e.g. app resume).
    pub async fn refresh_token(&self) -> Option<Arc<Credential>> {
        self.interceptors.tokens().refresh().await
    }

    /// Run one request through the full pipeline.
    ///
    /// Network-level failures trigger at most one failover probe and
    /// re-issue, guarded by the request's `retried` flag; a second failure
    /// surfaces a connectivity error without further probing.
    pub async fn execute(&self, mut req: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.interceptors.prepare(&mut req).await;

        let mut base = self.endpoints.active();
        loop {
            match self.transport.send(&base, &req).await {
                Ok(resp) => {
                    self.interceptors.apply_response_policy(&req, resp.status);
                    return if (200..300).contains(&resp.status) {
                        Ok(resp)
                    } else {
                        Err(ApiError::from_status(resp.status))
                    };
                }
                Err(err) => {
                    if req.retried {
                        self.notices.notify(Notice::ConnectivityLost);
                        return Err(ApiError::Network(err.to_string()));
                    }
                    req.retried = true;
                    match self.failover.try_failover().await {
                        Some(rebound) => base = rebound,
                        None => {
                            self.notices.notify(Notice::ConnectivityLost);
                            return Err(ApiError::Network(err.to_string()));
                        }
                    }
                }
            }
        }
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        Ok(self.execute(ApiRequest::get(path)).await?.body)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        Ok(self.execute(ApiRequest::post(path, body)).await?.body)
    }

    pub async fn post_action(&self, path: &str) -> Result<Value, ApiError> {
        Ok(self.execute(ApiRequest::post_empty(path)).await?.body)
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        Ok(self.execute(ApiRequest::put(path, body)).await?.body)
    }

    pub async fn delete_json(&self, path: &str) -> Result<Value, ApiError> {
        Ok(self.execute(ApiRequest::delete(path)).await?.body)
    }

    /// Sign in and persist the returned credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<Arc<Credential>, ApiError> {
        let req = ApiRequest::post("/auth/login", json!({"email": email, "password": password}))
            .on_auth_page();
        let resp = self.execute(req).await?;

        let token = token::token_from_response(&resp.body)
            .ok_or_else(|| ApiError::Decode("login response carried no token".to_string()))?;
        let cred = token::credential_from_token(token, token::user_from_response(&resp.body))?;
        info!(principal = %cred.principal.id, "signed in");
        Ok(self.store.set(cred))
    }

    /// Drop the session locally. The server holds no session state.
    pub fn logout(&self) {
        self.store.clear();
        info!("signed out; credential cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{make_test_token, MockTransport, RecordingNoticeSink};
    use chrono::Utc;

    fn client_with(
        transport: MockTransport,
    ) -> (Arc<ApiClient>, Arc<MockTransport>, Arc<RecordingNoticeSink>) {
        let transport = Arc::new(transport);
        let store = Arc::new(CredentialStore::new());
        let endpoints = Arc::new(EndpointState::new("http://primary", "http://fallback"));
        let notices = Arc::new(RecordingNoticeSink::default());
        let client = ApiClient::new(transport.clone(), store, endpoints, notices.clone());
        (client, transport, notices)
    }

    #[tokio::test]
    async fn success_passes_through() {
        let (client, _, notices) = client_with(
            MockTransport::new().on_ok("GET /tours/1", 200, json!({"id": 1})),
        );
        let body = client.get_json("/tours/1").await.unwrap();
        assert_eq!(body["id"], 1);
        assert!(notices.recorded().is_empty());
    }

    #[tokio::test]
    async fn non_success_maps_to_the_error_taxonomy() {
        let (client, _, _) = client_with(
            MockTransport::new()
                .on_ok("GET /a", 404, Value::Null)
                .on_ok("GET /b", 503, Value::Null),
        );
        assert_eq!(client.get_json("/a").await.unwrap_err(), ApiError::NotFound);
        assert_eq!(
            client.get_json("/b").await.unwrap_err(),
            ApiError::Server { status: 503 }
        );
    }

    #[tokio::test]
    async fn network_failure_fails_over_once_and_reissues() {
        let (client, transport, _) = client_with(
            MockTransport::new()
                .on_network_error("GET /tours/1")
                .on_ok("GET /tours/1", 200, json!({"id": 1}))
                .healthy(true),
        );

        let body = client.get_json("/tours/1").await.unwrap();
        assert_eq!(body["id"], 1);
        assert_eq!(transport.probe_count(), 1);
        assert_eq!(transport.call_count("GET /tours/1"), 2);
        assert_eq!(client.endpoints().active(), "http://fallback");
    }

    #[tokio::test]
    async fn two_network_failures_probe_only_once() {
        // Both sends fail; the reply queue's last entry repeats.
        let (client, transport, notices) = client_with(
            MockTransport::new()
                .on_network_error("GET /tours/1")
                .healthy(true),
        );

        let err = client.get_json("/tours/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(transport.probe_count(), 1);
        assert_eq!(transport.call_count("GET /tours/1"), 2);
        assert_eq!(notices.recorded(), vec![Notice::ConnectivityLost]);
    }

    #[tokio::test]
    async fn dead_fallback_surfaces_connectivity_loss_without_reissue() {
        let (client, transport, notices) = client_with(
            MockTransport::new()
                .on_network_error("GET /tours/1")
                .healthy(false),
        );

        let err = client.get_json("/tours/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(transport.call_count("GET /tours/1"), 1);
        assert_eq!(notices.recorded(), vec![Notice::ConnectivityLost]);
        assert_eq!(client.endpoints().active(), "http://primary");
    }

    #[tokio::test]
    async fn login_stores_the_credential() {
        let now = Utc::now().timestamp();
        let token = make_test_token("u9", now + 3_600, now);
        let (client, transport, _) = client_with(MockTransport::new().on_ok(
            "POST /auth/login",
            200,
            json!({"token": token, "user": {"id": "u9", "role": "agent"}}),
        ));

        let cred = client.login("a@b.c", "hunter2").await.unwrap();
        assert_eq!(cred.principal.id, "u9");
        assert_eq!(client.store().get().unwrap().token, token);
        // Login itself goes out unauthenticated.
        assert!(transport.calls()[0].bearer.is_none());

        client.logout();
        assert!(client.store().get().is_none());
    }

    #[tokio::test]
    async fn refresh_is_idempotent_and_failure_leaves_store_untouched() {
        let now = Utc::now().timestamp();
        let initial = make_test_token("u1", now + 200, now - 3_600);
        let fresh = make_test_token("u1", now + 7_200, now);
        let (client, _, _) = client_with(
            MockTransport::new()
                .on_ok("POST /auth/refresh-token", 200, json!({"token": fresh}))
                .on_ok("POST /auth/refresh-token", 200, json!({"token": fresh}))
                .on_network_error("POST /auth/refresh-token"),
        );
        client.store().set(
            token::credential_from_token(&initial, None).unwrap(),
        );

        // Two refreshes in sequence: each yields a credential at least as
        // fresh as before.
        let first = client.refresh_token().await.unwrap();
        assert!(first.expires_at >= now + 200);
        let second = client.refresh_token().await.unwrap();
        assert!(second.expires_at >= first.expires_at);

        // Third call hits the scripted network error: store keeps the last
        // good credential.
        assert!(client.refresh_token().await.is_none());
        assert_eq!(client.store().get().unwrap().token, fresh);
    }
}
