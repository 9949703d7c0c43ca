//! Wayfarer Fetch Orchestration
//!
//! Drives the remote-data lifecycles of a page:
//!
//! - [`state`]: the per-entity `(loading, error, retry_count)` record
//! - [`orchestrator`]: watchdog + bounded-retry fetch driver for one entity
//! - [`page`]: the detail-page controller coordinating independent entities
//! - [`mutate`]: optimistic toggles with rollback
//! - [`paginate`]: the debounced paginated sub-resource loader
//!
//! Every entity on a page gets its own [`orchestrator::FetchOrchestrator`],
//! so one slow or failing fetch never blocks unrelated sections from
//! rendering, and the watchdog/retry pair guarantees nothing stays in a
//! loading state forever.

pub mod mutate;
pub mod orchestrator;
pub mod page;
pub mod paginate;
pub mod state;

// Re-export main types for convenience
pub use mutate::{MutationEngine, ToggleAction, ToggleOutcome};
pub use orchestrator::FetchOrchestrator;
pub use page::TourPage;
pub use paginate::ReviewLoader;
pub use state::{Phase, RequestState};
