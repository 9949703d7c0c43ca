//! The per-entity fetch driver.
//!
//! One [`FetchOrchestrator`] owns one entity's [`RequestState`] and
//! snapshot. It issues the fetch, races it against a watchdog, retries
//! transient failures a bounded number of times, and exposes the manual
//! refresh that resets everything.
//!
//! Cancellation is structural: every scheduled retry is an aborted-on-
//! invalidation task, and in-flight attempts carry a generation stamp so a
//! settled-but-stale attempt can never overwrite fresher state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use wayfarer_types::error::ApiError;
use wayfarer_types::retry::FetchPolicy;

use crate::state::RequestState;

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

pub struct FetchOrchestrator<T> {
    label: String,
    policy: FetchPolicy,
    state: RwLock<RequestState>,
    snapshot: RwLock<Option<T>>,
    /// Bumped whenever pending work is invalidated; attempts and retry
    /// timers carry the value they were started under and stand down if it
    /// has moved.
    generation: AtomicU64,
    pending_retry: Mutex<Option<AbortHandle>>,
    fetch: FetchFn<T>,
    weak: Weak<FetchOrchestrator<T>>,
}

impl<T: Send + Sync + 'static> FetchOrchestrator<T> {
    pub fn new<F, Fut>(label: impl Into<String>, policy: FetchPolicy, fetch: F) -> Arc<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Arc::new_cyclic(|weak| Self {
            label: label.into(),
            policy,
            state: RwLock::new(RequestState::idle()),
            snapshot: RwLock::new(None),
            generation: AtomicU64::new(0),
            pending_retry: Mutex::new(None),
            fetch: Arc::new(move || fetch().boxed()),
            weak: weak.clone(),
        })
    }

    /// Current request state snapshot.
    pub fn state(&self) -> RequestState {
        self.state.read().clone()
    }

    /// Apply a local delta to the snapshot. Reserved for the optimistic
    /// mutation engine; fetch results always replace the value wholesale.
    pub fn update_snapshot(&self, f: impl FnOnce(&mut Option<T>)) {
        f(&mut self.snapshot.write());
    }

    /// Start loading unless a load is already in flight.
    ///
    /// This is the only entry point for both initial loads and scheduled
    /// retries; retries do not get a separate guard-free path.
    pub async fn load(&self) {
        if self.state.read().loading {
            debug!(entity = %self.label, "load skipped; already in flight");
            return;
        }
        let gen = self.invalidate();
        self.attempt(gen, 0).await;
    }

    /// Manual refresh: cancel any pending watchdog/retry, reset the record
    /// to `{loading: true, error: None, retry_count: 0}`, and restart.
    pub async fn refresh(&self) {
        let gen = self.invalidate();
        *self.state.write() = RequestState {
            loading: true,
            error: None,
            retry_count: 0,
        };
        info!(entity = %self.label, "manual refresh");
        self.attempt(gen, 0).await;
    }

    /// Abort the pending retry timer and invalidate in-flight attempts.
    fn invalidate(&self) -> u64 {
        if let Some(handle) = self.pending_retry.lock().take() {
            handle.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn attempt(&self, gen: u64, retry_count: u32) {
        {
            let mut st = self.state.write();
            *st = RequestState {
                loading: true,
                error: st.error.clone(),
                retry_count,
            };
        }
        debug!(entity = %self.label, retry_count, "fetch attempt started");

        // The watchdog is the other select arm: if it wins, the attempt's
        // future is dropped and the entity leaves the loading state no
        // matter what the network does.
        let outcome = tokio::select! {
            result = (self.fetch)() => Some(result),
            _ = sleep(self.policy.effective_watchdog()) => None,
        };

        if self.generation.load(Ordering::SeqCst) != gen {
            debug!(entity = %self.label, "stale attempt discarded");
            return;
        }

        match outcome {
            Some(Ok(data)) => {
                *self.snapshot.write() = Some(data);
                *self.state.write() = RequestState {
                    loading: false,
                    error: None,
                    retry_count: 0,
                };
                debug!(entity = %self.label, "fetch succeeded");
            }
            Some(Err(err)) => self.handle_failure(gen, retry_count, err),
            None => {
                warn!(entity = %self.label, "watchdog expired; forcing out of loading");
                *self.state.write() = RequestState {
                    loading: false,
                    error: Some(ApiError::Timeout.to_string()),
                    retry_count,
                };
            }
        }
    }

    fn handle_failure(&self, gen: u64, retry_count: u32, err: ApiError) {
        let attempts = retry_count + 1;
        let exhausted = attempts >= self.policy.max_retries;
        let message = if exhausted && self.policy.max_retries > 1 {
            ApiError::Exhausted(err.to_string()).to_string()
        } else {
            err.to_string()
        };

        *self.state.write() = RequestState {
            loading: false,
            error: Some(message),
            retry_count: attempts,
        };

        if exhausted || !err.is_retryable() {
            warn!(entity = %self.label, attempts, %err, "fetch failed; awaiting manual refresh");
            return;
        }

        warn!(
            entity = %self.label, attempts, %err,
            delay = ?self.policy.retry_delay, "fetch failed; retry scheduled"
        );
        self.schedule_retry(gen, attempts);
    }

    fn schedule_retry(&self, gen: u64, retry_count: u32) {
        let Some(me) = self.weak.upgrade() else {
            return;
        };
        let delay = self.policy.retry_delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if me.generation.load(Ordering::SeqCst) != gen {
                return;
            }
            debug!(entity = %me.label, retry_count, "scheduled retry firing");
            me.attempt(gen, retry_count).await;
        });

        let mut slot = self.pending_retry.lock();
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        *slot = Some(handle.abort_handle());
    }
}

impl<T: Clone + Send + Sync + 'static> FetchOrchestrator<T> {
    /// Clone of the last successful payload, if any.
    pub fn snapshot(&self) -> Option<T> {
        self.snapshot.read().clone()
    }
}
