//! The per-entity request state record.

/// What the view layer reads to render one entity's section: a spinner
/// while `loading`, the error banner when `error` is set, the data
/// otherwise.
///
/// Single-writer: only the orchestrator (or loader) that owns the record
/// mutates it, and always by whole-value replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestState {
    pub loading: bool,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl RequestState {
    pub fn idle() -> Self {
        Self {
            loading: false,
            error: None,
            retry_count: 0,
        }
    }

    /// Derive the lifecycle phase, given whether a snapshot exists.
    pub fn phase(&self, has_data: bool) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else if has_data {
            Phase::Success
        } else {
            Phase::Idle
        }
    }
}

impl Default for RequestState {
    fn default() -> Self {
        Self::idle()
    }
}

/// `Idle -> Loading -> {Success, Failed}`; `Failed` can re-enter `Loading`
/// via bounded retry or manual refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failed,
}
