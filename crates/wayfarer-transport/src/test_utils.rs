//! Test utilities for the transport layer.
//!
//! Provides a scripted [`MockTransport`], a recording notice sink, and a
//! token fixture helper, so pipeline behavior can be exercised without a
//! network.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new()
//!     .on_ok("GET /tours/42", 200, json!({"id": 42, "title": "Alps"}))
//!     .on_network_error("GET /tours/43");
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::notice::{Notice, NoticeSink};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, TransportError};

/// Build a structurally valid unsigned test token with the given claims.
pub fn make_test_token(id: &str, exp: i64, iat: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"id": id, "role": "traveler", "exp": exp, "iat": iat}).to_string(),
    );
    format!("{header}.{payload}.sig")
}

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Ok {
        status: u16,
        body: Value,
        delay: Option<Duration>,
    },
    NetworkError,
}

/// Scripted in-memory transport.
///
/// Replies are keyed by route (`"GET /tours/42"`) and consumed in order;
/// the last reply for a route repeats indefinitely, which is what retry
/// tests want. Every request is recorded for assertions.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockOutcome>>>,
    calls: Mutex<Vec<ApiRequest>>,
    probes: AtomicUsize,
    healthy: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for a route.
    pub fn on(self, route: &str, outcome: MockOutcome) -> Self {
        self.routes
            .lock()
            .entry(route.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn on_ok(self, route: &str, status: u16, body: Value) -> Self {
        self.on(
            route,
            MockOutcome::Ok {
                status,
                body,
                delay: None,
            },
        )
    }

    /// Reply that settles only after `delay` (pairs with paused-time
    /// tests).
    pub fn on_ok_after(self, route: &str, delay: Duration, status: u16, body: Value) -> Self {
        self.on(
            route,
            MockOutcome::Ok {
                status,
                body,
                delay: Some(delay),
            },
        )
    }

    pub fn on_network_error(self, route: &str) -> Self {
        self.on(route, MockOutcome::NetworkError)
    }

    /// Scripted health-probe answer.
    pub fn healthy(self, yes: bool) -> Self {
        self.probes.store(0, Ordering::SeqCst);
        self.healthy.store(yes, Ordering::SeqCst);
        self
    }

    /// All requests seen so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    /// How many times a route was hit.
    pub fn call_count(&self, route: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.route() == route).count()
    }

    /// How many health probes were issued.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, route: &str) -> MockOutcome {
        let mut routes = self.routes.lock();
        let Some(queue) = routes.get_mut(route) else {
            panic!("MockTransport: no scripted reply for `{route}`");
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| panic!("MockTransport: replies for `{route}` exhausted"))
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, _base: &str, req: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().push(req.clone());
        match self.next_outcome(&req.route()) {
            MockOutcome::Ok {
                status,
                body,
                delay,
            } => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(ApiResponse { status, body })
            }
            MockOutcome::NetworkError => Err(TransportError("connection refused".to_string())),
        }
    }

    async fn probe(&self, _base: &str, _timeout: Duration) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.healthy.load(Ordering::SeqCst)
    }
}

/// Notice sink that records everything for assertions.
#[derive(Default)]
pub struct RecordingNoticeSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNoticeSink {
    pub fn recorded(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl NoticeSink for RecordingNoticeSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
