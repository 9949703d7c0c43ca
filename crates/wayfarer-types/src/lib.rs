//! Shared types for the wayfarer workspace.
//!
//! This crate provides foundational types used across the transport and
//! fetcher crates, breaking circular dependency chains:
//!
//! - [`credential`]: the authenticated session record and its token claims
//! - [`dto`]: canonical remote payload shapes and per-endpoint adapters
//! - [`error`]: the normalized error taxonomy surfaced to the view layer
//! - [`retry`]: fetch policy knobs (watchdog, bounded retry)
//! - [`env_utils`]: environment variable parsing helpers

pub mod credential;
pub mod dto;
pub mod env_utils;
pub mod error;
pub mod retry;

pub use credential::{Claims, Credential, Principal, Role, EXPIRY_MARGIN_SECS, MAX_TOKEN_CHARS};
pub use dto::{PaginationCursor, Review, ReviewPage, Tour, TourSummary};
pub use error::ApiError;
pub use retry::FetchPolicy;
