//! Token lifecycle: decoding, expiry checks, proactive refresh.
//!
//! Tokens are the usual three-segment dot-delimited structure with a
//! base64url payload carrying `{id, role, exp, iat}`. Signature
//! verification is the server's job; the client only decodes the payload to
//! reason about expiry. Anything that does not decode is treated as
//! expiring (fail closed), and anything over [`MAX_TOKEN_CHARS`] is treated
//! as corrupt and never sent.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use wayfarer_types::credential::{
    Claims, Credential, Principal, Role, EXPIRY_MARGIN_SECS, MAX_TOKEN_CHARS,
};
use wayfarer_types::error::ApiError;

use crate::failover::EndpointState;
use crate::store::CredentialStore;
use crate::transport::{ApiRequest, HttpTransport};

/// Structural validity: within the length ceiling and three non-empty
/// dot-delimited segments. Says nothing about expiry.
pub fn is_well_formed(token: &str) -> bool {
    if token.len() > MAX_TOKEN_CHARS {
        return false;
    }
    let mut parts = token.split('.');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() && !s.is_empty()
    )
}

/// Decode the payload segment into [`Claims`].
pub fn decode_claims(token: &str) -> Result<Claims, ApiError> {
    if token.len() > MAX_TOKEN_CHARS {
        return Err(ApiError::InvalidCredential);
    }
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(ApiError::InvalidCredential);
    }
    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| ApiError::Decode(format!("token payload is not base64url: {e}")))?;
    serde_json::from_slice(&payload)
        .map_err(|e| ApiError::Decode(format!("token payload is not valid claims JSON: {e}")))
}

/// Whether the token should be refreshed before use.
///
/// True when remaining validity is under the five-minute margin, or when
/// the token cannot be decoded at all.
pub fn is_expiring_soon(token: &str) -> bool {
    expiring_soon_at(token, Utc::now().timestamp())
}

/// Clock-injected core of [`is_expiring_soon`].
pub fn expiring_soon_at(token: &str, now: i64) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.exp - now < EXPIRY_MARGIN_SECS,
        Err(_) => true,
    }
}

/// Pull the token string out of an auth response body, tolerating the
/// `data` envelope.
pub fn token_from_response(body: &Value) -> Option<&str> {
    body.get("token")
        .and_then(Value::as_str)
        .or_else(|| body.get("data")?.get("token")?.as_str())
}

/// Pull the optional user object out of an auth response body.
pub fn user_from_response(body: &Value) -> Option<&Value> {
    body.get("user")
        .or_else(|| body.get("data")?.get("user"))
        .filter(|v| v.is_object())
}

fn principal_from_value(v: &Value) -> Option<Principal> {
    let id = v.get("id").and_then(|x| {
        x.as_str()
            .map(str::to_string)
            .or_else(|| x.as_u64().map(|n| n.to_string()))
    })?;
    let role = v
        .get("role")
        .and_then(Value::as_str)
        .map(Role::parse)
        .unwrap_or_default();
    Some(Principal { id, role })
}

/// Build a [`Credential`] from a fresh token, preferring the server's user
/// object over the token claims for the principal.
pub fn credential_from_token(token: &str, user: Option<&Value>) -> Result<Credential, ApiError> {
    let claims = decode_claims(token)?;
    let principal = user
        .and_then(principal_from_value)
        .unwrap_or_else(|| claims.principal());
    Ok(Credential {
        token: token.to_string(),
        expires_at: claims.exp,
        issued_at: claims.iat,
        principal,
    })
}

/// Performs the refresh call and owns the store writes that go with it.
pub struct TokenManager {
    transport: Arc<dyn HttpTransport>,
    endpoints: Arc<EndpointState>,
    store: Arc<CredentialStore>,
}

impl TokenManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoints: Arc<EndpointState>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            store,
        }
    }

    /// Refresh the current token via `POST /auth/refresh-token`.
    ///
    /// On success the new credential is persisted to the store and
    /// returned. On any failure (network, rejection, undecodable response)
    /// the store is left untouched and `None` is returned; the caller
    /// decides whether to proceed with the stale token.
    ///
    /// An oversized token is purged without attempting the call at all: it
    /// would produce a request header the transport cannot safely send.
    pub async fn refresh(&self) -> Option<Arc<Credential>> {
        let current = self.store.get()?;
        if current.token.len() > MAX_TOKEN_CHARS {
            warn!("oversized token purged; refresh not attempted");
            self.store.clear();
            return None;
        }

        let mut req = ApiRequest::post_empty("/auth/refresh-token");
        req.bearer = Some(current.token.clone());

        match self.transport.send(&self.endpoints.active(), &req).await {
            Ok(resp) if (200..300).contains(&resp.status) => {
                let Some(token) = token_from_response(&resp.body) else {
                    warn!("refresh response carried no token");
                    return None;
                };
                match credential_from_token(token, user_from_response(&resp.body)) {
                    Ok(cred) => {
                        debug!(expires_at = cred.expires_at, "token refreshed");
                        Some(self.store.set(cred))
                    }
                    Err(err) => {
                        warn!(%err, "refresh returned an undecodable token");
                        None
                    }
                }
            }
            Ok(resp) => {
                warn!(status = resp.status, "token refresh rejected");
                None
            }
            Err(err) => {
                warn!(%err, "token refresh failed");
                None
            }
        }
    }
}
