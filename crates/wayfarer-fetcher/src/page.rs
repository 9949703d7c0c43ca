//! The tour detail-page controller.
//!
//! Owns one orchestrator per entity on the page: the tour itself, the
//! related-tours list, and the paginated reviews. The three load
//! independently; the view renders each section from its own
//! [`RequestState`](crate::state::RequestState) and must tolerate any
//! arrival order. Manual refresh is a full-page reconciliation, not a
//! per-entity patch.

use std::sync::Arc;

use tracing::info;

use wayfarer_transport::client::ApiClient;
use wayfarer_types::dto::{tour_from_value, tour_list_from_value, Tour, TourSummary};
use wayfarer_types::retry::FetchPolicy;

use crate::mutate::{MutationEngine, ToggleAction, ToggleOutcome};
use crate::orchestrator::FetchOrchestrator;
use crate::paginate::{ReviewLoader, DEFAULT_PAGE_SIZE};

pub struct TourPage {
    tour_id: u64,
    tour: Arc<FetchOrchestrator<Tour>>,
    related: Arc<FetchOrchestrator<Vec<TourSummary>>>,
    reviews: Arc<ReviewLoader>,
    mutations: MutationEngine,
}

impl TourPage {
    pub fn new(api: Arc<ApiClient>, tour_id: u64) -> Self {
        let tour = FetchOrchestrator::new("tour", FetchPolicy::primary(), {
            let api = Arc::clone(&api);
            move || {
                let api = Arc::clone(&api);
                async move {
                    let body = api.get_json(&format!("/tours/{tour_id}")).await?;
                    tour_from_value(&body)
                }
            }
        });

        let related = FetchOrchestrator::new("related-tours", FetchPolicy::background(), {
            let api = Arc::clone(&api);
            move || {
                let api = Arc::clone(&api);
                async move {
                    let body = api.get_json(&format!("/tours/{tour_id}/related")).await?;
                    tour_list_from_value(&body)
                }
            }
        });

        let reviews = ReviewLoader::new(Arc::clone(&api), tour_id);
        let mutations = MutationEngine::new(api);

        Self {
            tour_id,
            tour,
            related,
            reviews,
            mutations,
        }
    }

    pub fn tour_id(&self) -> u64 {
        self.tour_id
    }

    pub fn tour(&self) -> &Arc<FetchOrchestrator<Tour>> {
        &self.tour
    }

    pub fn related(&self) -> &Arc<FetchOrchestrator<Vec<TourSummary>>> {
        &self.related
    }

    pub fn reviews(&self) -> &Arc<ReviewLoader> {
        &self.reviews
    }

    /// Kick off the initial load of every entity. The fetches are causally
    /// independent and settle in whatever order the network dictates.
    pub async fn mount(&self) {
        info!(tour_id = self.tour_id, "page mounted");
        tokio::join!(
            self.tour.load(),
            self.related.load(),
            self.reviews.load_page(1, DEFAULT_PAGE_SIZE),
        );
    }

    /// Full-page reconciliation: cancel everything pending, reset every
    /// entity's state, and reload the primary record, the related list, and
    /// the current reviews page.
    pub async fn refresh_all(&self) {
        info!(tour_id = self.tour_id, "manual page refresh");
        tokio::join!(
            self.tour.refresh(),
            self.related.refresh(),
            self.reviews.refresh(),
        );
    }

    /// Optimistically toggle a flag on the primary record.
    pub async fn toggle(&self, action: ToggleAction) -> ToggleOutcome {
        self.mutations.toggle(&self.tour, self.tour_id, action).await
    }
}
