//! Optimistic toggle mutations.
//!
//! A toggle flips local view state immediately, then tells the server. If
//! the server disagrees, the local state is rolled back to exactly the
//! pre-toggle value and the user gets a transient notice. While one toggle
//! for a given `(tour, action)` key is in flight, further toggles for the
//! same key are rejected so an unresolved double-toggle can never make
//! local state drift.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use wayfarer_transport::client::ApiClient;
use wayfarer_transport::notice::{Notice, NoticeSink};
use wayfarer_types::dto::Tour;

use crate::orchestrator::FetchOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleAction {
    Favorite,
    Wishlist,
}

impl ToggleAction {
    fn path(&self, tour_id: u64) -> String {
        match self {
            ToggleAction::Favorite => format!("/tours/{tour_id}/favorite"),
            ToggleAction::Wishlist => format!("/tours/{tour_id}/wishlist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Applied locally and confirmed by the server.
    Confirmed,
    /// Applied locally, refused remotely, reverted.
    RolledBack,
    /// Ignored: same key already in flight, or nothing loaded yet.
    Rejected,
}

pub struct MutationEngine {
    api: Arc<ApiClient>,
    notices: Arc<dyn NoticeSink>,
    in_flight: Mutex<HashSet<(u64, ToggleAction)>>,
}

/// Releases the in-flight key when the toggle settles, on every path.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<(u64, ToggleAction)>>,
    key: (u64, ToggleAction),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

impl MutationEngine {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let notices = api.notices();
        Self {
            api,
            notices,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Toggle `action` on the tour held by `tour`.
    ///
    /// The add/remove variant of the remote call is chosen by the
    /// pre-toggle state: currently off means `POST`, currently on means
    /// `DELETE`.
    pub async fn toggle(
        &self,
        tour: &FetchOrchestrator<Tour>,
        tour_id: u64,
        action: ToggleAction,
    ) -> ToggleOutcome {
        let key = (tour_id, action);
        if !self.in_flight.lock().insert(key) {
            debug!(tour_id, ?action, "toggle rejected; previous one still in flight");
            return ToggleOutcome::Rejected;
        }
        let _guard = InFlightGuard {
            set: &self.in_flight,
            key,
        };

        let Some(before) = tour.snapshot() else {
            debug!(tour_id, ?action, "toggle ignored; nothing loaded yet");
            return ToggleOutcome::Rejected;
        };

        let adding = match action {
            ToggleAction::Favorite => !before.favorited,
            ToggleAction::Wishlist => !before.wishlisted,
        };

        // Optimistic apply: the view updates before the server answers.
        tour.update_snapshot(|t| {
            if let Some(t) = t {
                match action {
                    ToggleAction::Favorite => {
                        t.favorited = adding;
                        t.favorite_count = if adding {
                            t.favorite_count.saturating_add(1)
                        } else {
                            t.favorite_count.saturating_sub(1)
                        };
                    }
                    ToggleAction::Wishlist => t.wishlisted = adding,
                }
            }
        });

        let path = action.path(tour_id);
        let result = if adding {
            self.api.post_action(&path).await
        } else {
            self.api.delete_json(&path).await
        };

        match result {
            Ok(_) => {
                debug!(tour_id, ?action, adding, "toggle confirmed");
                ToggleOutcome::Confirmed
            }
            Err(err) => {
                // Roll back to the exact pre-toggle values.
                tour.update_snapshot(|t| {
                    if let Some(t) = t {
                        match action {
                            ToggleAction::Favorite => {
                                t.favorited = before.favorited;
                                t.favorite_count = before.favorite_count;
                            }
                            ToggleAction::Wishlist => t.wishlisted = before.wishlisted,
                        }
                    }
                });
                warn!(tour_id, ?action, %err, "toggle refused; local state reverted");
                self.notices.notify(Notice::ActionFailed(err.to_string()));
                ToggleOutcome::RolledBack
            }
        }
    }
}
