//! Endpoint resolution and failover.
//!
//! The active base endpoint is process-wide mutable state: set at bootstrap
//! from the environment, rebound by the failover controller when the
//! primary stops answering. Requests always read the endpoint at issue
//! time, so a rebind transparently redirects everything that follows.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};

use wayfarer_types::env_utils::env_var;

use crate::transport::HttpTransport;

/// Local development ports: the API normally listens on 8080, with a
/// secondary instance on 3000.
pub const DEFAULT_PRIMARY_ENDPOINT: &str = "http://localhost:8080/api";
pub const DEFAULT_FALLBACK_ENDPOINT: &str = "http://localhost:3000/api";

/// How long the health probe may take before the fallback is declared dead.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The process-wide endpoint binding.
#[derive(Debug)]
pub struct EndpointState {
    active: RwLock<String>,
    fallback: String,
}

impl EndpointState {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            active: RwLock::new(primary.into()),
            fallback: fallback.into(),
        }
    }

    /// Resolve endpoints from `WAYFARER_API_ENDPOINT` and
    /// `WAYFARER_FALLBACK_ENDPOINT`, with the local port pair as default.
    pub fn from_env() -> Self {
        let primary = env_var::<String>("WAYFARER_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_PRIMARY_ENDPOINT.to_string());
        let fallback = env_var::<String>("WAYFARER_FALLBACK_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_FALLBACK_ENDPOINT.to_string());
        Self::new(primary, fallback)
    }

    /// The base endpoint requests should target right now.
    pub fn active(&self) -> String {
        self.active.read().clone()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Point all subsequent requests at `url`.
    pub fn rebind(&self, url: impl Into<String>) {
        *self.active.write() = url.into();
    }
}

/// Probes the fallback endpoint after a network-level failure and rebinds
/// if it answers.
pub struct FailoverController {
    transport: Arc<dyn HttpTransport>,
    endpoints: Arc<EndpointState>,
}

impl FailoverController {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoints: Arc<EndpointState>) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Health-check the fallback; on success rebind the active endpoint and
    /// return the new base for the caller to re-issue against. Returns
    /// `None` when the fallback is also down or is already active.
    pub async fn try_failover(&self) -> Option<String> {
        let fallback = self.endpoints.fallback().to_string();
        if fallback == self.endpoints.active() {
            warn!("failover requested but fallback endpoint is already active");
            return None;
        }

        if self.transport.probe(&fallback, PROBE_TIMEOUT).await {
            info!(endpoint = %fallback, "failing over to secondary endpoint");
            self.endpoints.rebind(fallback.clone());
            Some(fallback)
        } else {
            warn!(endpoint = %fallback, "fallback endpoint did not answer the health probe");
            None
        }
    }
}
