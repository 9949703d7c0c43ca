//! User-facing notices emitted by the transport policies.
//!
//! The pipeline never renders anything itself; it emits typed [`Notice`]
//! values into a [`NoticeSink`] and the view layer decides how (and
//! whether) to present them.

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something the user should know but which does not block the flow.
    Warning(String),
    /// The session is gone; the view should route to login and come back to
    /// `return_to` afterwards.
    SessionExpired { return_to: String },
    /// 403: the action is not available to this principal.
    PermissionDenied,
    /// 404: the entity the page asked for does not exist.
    NotFound,
    /// 5xx: the backend failed; nothing the user did was wrong.
    ServerError { status: u16 },
    /// Neither endpoint is reachable.
    ConnectivityLost,
    /// A user action (e.g. a favorite toggle) was undone after a remote
    /// failure.
    ActionFailed(String),
}

pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default sink: forwards notices to the tracing subscriber. Installed when
/// the embedding application has not provided its own.
#[derive(Debug, Default)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn notify(&self, notice: Notice) {
        warn!(?notice, "user notice");
    }
}
