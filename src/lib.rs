//! Wayfarer: resilient remote-data orchestration for a travel client.
//!
//! This facade crate re-exports the workspace members:
//!
//! - [`types`]: credentials, DTOs and adapters, the error taxonomy
//! - [`transport`]: credential store, token lifecycle, interceptor
//!   pipeline, endpoint failover, the `ApiClient`
//! - [`fetcher`]: per-entity fetch orchestration, the page controller,
//!   optimistic mutations, the debounced review loader
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wayfarer::transport::{ApiClient, CredentialStore};
//! use wayfarer::fetcher::TourPage;
//!
//! let store = Arc::new(CredentialStore::new());
//! let api = ApiClient::from_env(store);
//! let page = TourPage::new(api, 42);
//! page.mount().await;
//! ```

pub use wayfarer_fetcher as fetcher;
pub use wayfarer_transport as transport;
pub use wayfarer_types as types;
