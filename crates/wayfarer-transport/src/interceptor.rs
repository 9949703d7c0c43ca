//! Request/response middleware.
//!
//! The request phase decides what (if anything) goes in the
//! `Authorization` header; the response phase applies the status-driven
//! policy table. Both run for every call the [`crate::client::ApiClient`]
//! issues, so no call site carries its own auth or status handling.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::notice::{Notice, NoticeSink};
use crate::store::CredentialStore;
use crate::token::{self, TokenManager};
use crate::transport::ApiRequest;

/// Extensions that never carry credentials.
const STATIC_ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "map", "woff", "woff2",
];

/// Whether `path` refers to a static asset (credential attachment is
/// skipped for these).
pub fn is_static_asset(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.rsplit_once('.') {
        Some((_, ext)) => STATIC_ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// What the response phase does for a given status. One table, one
/// dispatch point; call sites never branch on status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePolicy {
    PassThrough,
    /// 401: the credential is dead; purge it and send the user to login.
    PurgeAndRelogin,
    /// 403: surface only, no redirect.
    PermissionDenied,
    /// 404: surface only.
    NotFound,
    /// 5xx: surface only; entity-level retry may still apply upstream.
    ServerError,
}

/// The status → policy table.
pub fn policy_for(status: u16) -> ResponsePolicy {
    match status {
        401 => ResponsePolicy::PurgeAndRelogin,
        403 => ResponsePolicy::PermissionDenied,
        404 => ResponsePolicy::NotFound,
        s if s >= 500 => ResponsePolicy::ServerError,
        _ => ResponsePolicy::PassThrough,
    }
}

pub struct Interceptors {
    store: Arc<CredentialStore>,
    tokens: TokenManager,
    notices: Arc<dyn NoticeSink>,
}

impl Interceptors {
    pub fn new(
        store: Arc<CredentialStore>,
        tokens: TokenManager,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            store,
            tokens,
            notices,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Request phase: attach, refresh-then-attach, or withhold the bearer
    /// token.
    ///
    /// A refresh failure never blocks the call; the still-valid-but-aging
    /// original token is attached instead and the server gets to decide.
    pub async fn prepare(&self, req: &mut ApiRequest) {
        if is_static_asset(&req.path) {
            return;
        }

        let Some(cred) = self.store.get() else {
            return;
        };

        if !token::is_well_formed(&cred.token) {
            warn!("malformed token purged before send");
            self.store.clear();
            self.notices.notify(Notice::Warning(
                "Your session data was invalid and has been cleared. Please sign in again."
                    .to_string(),
            ));
            return;
        }

        if token::is_expiring_soon(&cred.token) {
            if let Some(fresh) = self.tokens.refresh().await {
                req.bearer = Some(fresh.token.clone());
                return;
            }
            debug!("proceeding with aging token after failed refresh");
        }

        req.bearer = Some(cred.token.clone());
    }

    /// Response phase: run the policy table against a received status.
    pub fn apply_response_policy(&self, req: &ApiRequest, status: u16) {
        match policy_for(status) {
            ResponsePolicy::PassThrough => {}
            ResponsePolicy::PurgeAndRelogin => {
                warn!(path = %req.path, "credential rejected; purging session");
                self.store.clear();
                if !req.from_auth_page {
                    self.notices.notify(Notice::SessionExpired {
                        return_to: req.path.clone(),
                    });
                }
            }
            ResponsePolicy::PermissionDenied => self.notices.notify(Notice::PermissionDenied),
            ResponsePolicy::NotFound => self.notices.notify(Notice::NotFound),
            ResponsePolicy::ServerError => {
                self.notices.notify(Notice::ServerError { status });
            }
        }
    }
}
