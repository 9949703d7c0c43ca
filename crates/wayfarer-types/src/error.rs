//! Normalized error taxonomy for remote operations.
//!
//! Low-level transport failures are mapped into [`ApiError`] at the
//! transport boundary, so the request state tracker and the view layer only
//! ever see one error shape with a human-readable message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No HTTP response was received.
    #[error("could not reach the server: {0}")]
    Network(String),

    /// The watchdog expired before the call settled.
    #[error("the request timed out")]
    Timeout,

    /// 401: the credential is no longer accepted.
    #[error("your session has expired, please sign in again")]
    Unauthorized,

    /// 403: the action is not allowed for this principal.
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// 404: the entity does not exist (or was removed).
    #[error("the requested resource was not found")]
    NotFound,

    /// 5xx: the server failed to handle the request.
    #[error("server error (status {status})")]
    Server { status: u16 },

    /// Any other non-success status.
    #[error("request failed with status {0}")]
    Status(u16),

    /// The stored token failed local shape/length validation.
    #[error("stored credential is malformed")]
    InvalidCredential,

    /// The response body could not be turned into the expected shape.
    #[error("could not decode server response: {0}")]
    Decode(String),

    /// Automatic retries were exhausted; only a manual refresh recovers.
    #[error("giving up after repeated failures: {0}")]
    Exhausted(String),
}

impl ApiError {
    /// Map a non-success HTTP status to its error variant.
    ///
    /// This is the classification half of the response policy table; the
    /// side-effect half (purge, notices) lives in the interceptor pipeline.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            s if s >= 500 => ApiError::Server { status: s },
            s => ApiError::Status(s),
        }
    }

    /// Whether the entity-level bounded retry may re-attempt after this
    /// error. Auth and validation failures are terminal for the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout | ApiError::Server { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_maps_the_policy_table() {
        assert_eq!(ApiError::from_status(401), ApiError::Unauthorized);
        assert_eq!(ApiError::from_status(403), ApiError::Forbidden);
        assert_eq!(ApiError::from_status(404), ApiError::NotFound);
        assert_eq!(ApiError::from_status(500), ApiError::Server { status: 500 });
        assert_eq!(ApiError::from_status(503), ApiError::Server { status: 503 });
        assert_eq!(ApiError::from_status(422), ApiError::Status(422));
    }

    #[test]
    fn retryable_covers_transient_failures_only() {
        assert!(ApiError::Network("refused".into()).is_retryable());
        assert!(ApiError::Timeout.is_retryable());
        assert!(ApiError::Server { status: 502 }.is_retryable());
        assert!(!ApiError::Unauthorized.is_retryable());
        assert!(!ApiError::Forbidden.is_retryable());
        assert!(!ApiError::NotFound.is_retryable());
        assert!(!ApiError::Status(422).is_retryable());
    }
}
