//! Debounced paginated sub-resource loading.
//!
//! Reviews are a best-effort child collection: rapid page flipping
//! coalesces into one network call for the last requested page, a failed
//! fetch keeps the previous page on screen, and there is no automatic
//! retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use wayfarer_transport::client::ApiClient;
use wayfarer_types::dto::{review_page_from_value, PaginationCursor, ReviewPage};

use crate::state::RequestState;

/// Page-change requests arriving within this window collapse into the last
/// one.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(400);

pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub struct ReviewLoader {
    api: Arc<ApiClient>,
    tour_id: u64,
    state: RwLock<RequestState>,
    /// The last successfully fetched page; stays visible through failures.
    current: RwLock<Option<ReviewPage>>,
    /// Last requested page/size (retained across retries), plus the total
    /// recomputed from each successful fetch.
    cursor: RwLock<PaginationCursor>,
    generation: AtomicU64,
    pending: Mutex<Option<AbortHandle>>,
    weak: Weak<ReviewLoader>,
}

impl ReviewLoader {
    pub fn new(api: Arc<ApiClient>, tour_id: u64) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            api,
            tour_id,
            state: RwLock::new(RequestState::idle()),
            current: RwLock::new(None),
            cursor: RwLock::new(PaginationCursor {
                page: 1,
                page_size: DEFAULT_PAGE_SIZE,
                total: 0,
            }),
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
            weak: weak.clone(),
        })
    }

    pub fn state(&self) -> RequestState {
        self.state.read().clone()
    }

    pub fn current_page(&self) -> Option<ReviewPage> {
        self.current.read().clone()
    }

    pub fn cursor(&self) -> PaginationCursor {
        *self.cursor.read()
    }

    /// Debounced page change. Returns immediately; the fetch fires once the
    /// burst settles.
    pub fn request_page(&self, page: u32, page_size: u32) {
        self.remember(page, page_size);
        let gen = self.invalidate();
        let Some(me) = self.weak.upgrade() else {
            return;
        };
        debug!(tour_id = self.tour_id, page, "review page change queued");
        let handle = tokio::spawn(async move {
            sleep(DEBOUNCE_WINDOW).await;
            if me.generation.load(Ordering::SeqCst) != gen {
                return;
            }
            me.fetch_now(gen).await;
        });
        *self.pending.lock() = Some(handle.abort_handle());
    }

    /// Immediate load of a page, no debounce (initial mount).
    pub async fn load_page(&self, page: u32, page_size: u32) {
        self.remember(page, page_size);
        let gen = self.invalidate();
        self.fetch_now(gen).await;
    }

    /// Manual refresh: cancel pending work, reset the record, reload the
    /// last requested page.
    pub async fn refresh(&self) {
        let gen = self.invalidate();
        *self.state.write() = RequestState {
            loading: true,
            error: None,
            retry_count: 0,
        };
        self.fetch_now(gen).await;
    }

    fn remember(&self, page: u32, page_size: u32) {
        let mut cursor = self.cursor.write();
        cursor.page = page;
        cursor.page_size = page_size;
    }

    fn invalidate(&self) -> u64 {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn fetch_now(&self, gen: u64) {
        {
            let mut st = self.state.write();
            *st = RequestState {
                loading: true,
                error: st.error.clone(),
                retry_count: 0,
            };
        }
        let (page, page_size) = {
            let cursor = self.cursor.read();
            (cursor.page, cursor.page_size)
        };

        let path = format!(
            "/tours/{}/reviews?page={page}&page_size={page_size}",
            self.tour_id
        );
        let result = self
            .api
            .get_json(&path)
            .await
            .and_then(|v| review_page_from_value(&v, page, page_size));

        if self.generation.load(Ordering::SeqCst) != gen {
            debug!(tour_id = self.tour_id, "stale review fetch discarded");
            return;
        }

        match result {
            Ok(fetched) => {
                self.cursor.write().total = fetched.cursor.total;
                *self.current.write() = Some(fetched);
                *self.state.write() = RequestState::idle();
                debug!(tour_id = self.tour_id, page, "review page loaded");
            }
            Err(err) => {
                // Best effort: no automatic retry; the previous page stays
                // visible under the error banner.
                warn!(tour_id = self.tour_id, page, %err, "review page fetch failed");
                *self.state.write() = RequestState {
                    loading: false,
                    error: Some(err.to_string()),
                    retry_count: 0,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfarer_transport::failover::EndpointState;
    use wayfarer_transport::store::CredentialStore;
    use wayfarer_transport::test_utils::{MockTransport, RecordingNoticeSink};

    fn loader_with(transport: MockTransport) -> (Arc<ReviewLoader>, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let api = ApiClient::new(
            transport.clone(),
            Arc::new(CredentialStore::new()),
            Arc::new(EndpointState::new("http://primary", "http://fallback")),
            Arc::new(RecordingNoticeSink::default()),
        );
        (ReviewLoader::new(api, 7), transport)
    }

    fn review_body(total: u64) -> serde_json::Value {
        json!({
            "reviews": [{"id": 1, "author": "mira", "body": "great", "rating": 5.0}],
            "total": total,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_page_changes_coalesces_into_one_call() {
        let (loader, transport) = loader_with(MockTransport::new().on_ok(
            "GET /tours/7/reviews?page=5&page_size=10",
            200,
            review_body(60),
        ));

        // Rapid flipping: only the last request survives the window.
        loader.request_page(2, 10);
        loader.request_page(3, 10);
        loader.request_page(5, 10);
        sleep(Duration::from_secs(1)).await;

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(
            transport.calls()[0].path,
            "/tours/7/reviews?page=5&page_size=10"
        );
        assert_eq!(loader.cursor().page, 5);
        assert_eq!(loader.cursor().total, 60);
        assert_eq!(loader.current_page().unwrap().items.len(), 1);
        assert_eq!(loader.state(), RequestState::idle());
    }

    #[tokio::test(start_paused = true)]
    async fn a_new_request_inside_the_window_restarts_the_clock() {
        let (loader, transport) = loader_with(MockTransport::new().on_ok(
            "GET /tours/7/reviews?page=3&page_size=10",
            200,
            review_body(30),
        ));

        loader.request_page(2, 10);
        sleep(Duration::from_millis(300)).await;
        loader.request_page(3, 10);
        // 350ms after the second request: neither window has elapsed.
        sleep(Duration::from_millis(350)).await;
        assert_eq!(transport.calls().len(), 0);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(loader.cursor().page, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_the_previous_page_visible() {
        let (loader, transport) = loader_with(
            MockTransport::new()
                .on_ok(
                    "GET /tours/7/reviews?page=1&page_size=10",
                    200,
                    review_body(12),
                )
                .on_ok("GET /tours/7/reviews?page=2&page_size=10", 500, json!(null)),
        );

        loader.load_page(1, 10).await;
        let first = loader.current_page().unwrap();

        loader.load_page(2, 10).await;
        assert_eq!(transport.calls().len(), 2);

        // No automatic retry, previous data intact, cursor keeps the
        // requested page for the manual path.
        let state = loader.state();
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert_eq!(loader.current_page().unwrap(), first);
        assert_eq!(loader.cursor().page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_reloads_the_last_requested_page() {
        let (loader, transport) = loader_with(
            MockTransport::new()
                .on_ok("GET /tours/7/reviews?page=4&page_size=10", 500, json!(null))
                .on_ok(
                    "GET /tours/7/reviews?page=4&page_size=10",
                    200,
                    review_body(44),
                ),
        );

        loader.load_page(4, 10).await;
        assert!(loader.state().error.is_some());

        loader.refresh().await;
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(loader.state(), RequestState::idle());
        assert_eq!(loader.cursor().total, 44);
    }
}
