//! Wayfarer Transport Layer
//!
//! Everything between "the page wants data" and "bytes on the wire":
//!
//! - [`store`]: the process-wide credential store with local persistence
//! - [`token`]: token decoding, proactive refresh, corruption checks
//! - [`interceptor`]: the request/response middleware pipeline
//! - [`failover`]: endpoint health probing and rebinding
//! - [`client`]: the [`ApiClient`] facade the rest of the app calls
//! - [`transport`]: the HTTP boundary trait and its reqwest implementation
//! - [`test_utils`]: mock transport and fixtures for tests
//!
//! # Example
//!
//! ```ignore
//! use wayfarer_transport::client::ApiClient;
//! use wayfarer_transport::store::CredentialStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(CredentialStore::new());
//! let client = ApiClient::from_env(store);
//! let tour = client.get_json("/tours/42").await?;
//! ```

pub mod client;
pub mod failover;
pub mod interceptor;
pub mod notice;
pub mod store;
pub mod test_utils;
pub mod token;
pub mod transport;

// Re-export main types for convenience
pub use client::ApiClient;
pub use failover::EndpointState;
pub use notice::{LogNoticeSink, Notice, NoticeSink};
pub use store::CredentialStore;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};
