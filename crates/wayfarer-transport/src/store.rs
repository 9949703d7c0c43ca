//! Process-wide credential store.
//!
//! Holds the single active [`Credential`] behind an `RwLock<Option<Arc<_>>>`.
//! Readers take an `Arc` snapshot, so a reader can never observe a
//! half-updated credential: writes swap the whole value.
//!
//! With a storage path configured, the token and user are persisted as a
//! small JSON document (`token` / `user` keys) so the session survives
//! process restarts; the file is rewritten on every set and deleted on
//! clear.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wayfarer_types::credential::{Credential, Principal};

use crate::token::decode_claims;

/// On-disk session document. Only the token and the user profile are
/// persisted; expiry is re-derived from the token itself on load.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<Principal>,
}

#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Arc<Credential>>>,
    storage_path: Option<PathBuf>,
}

impl CredentialStore {
    /// In-memory store, nothing persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store persisted at `path`. An existing session document is loaded if
    /// its token still decodes; a corrupt document is discarded.
    pub fn with_storage(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            current: RwLock::new(None),
            storage_path: Some(path.clone()),
        };

        if path.exists() {
            match store.load_persisted(&path) {
                Ok(cred) => {
                    *store.current.write() = Some(Arc::new(cred));
                    debug!("restored persisted session");
                }
                Err(err) => {
                    warn!(%err, "discarding unreadable session document");
                    let _ = fs::remove_file(&path);
                }
            }
        }

        Ok(store)
    }

    /// Default session document location under the platform data directory.
    pub fn default_storage_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("wayfarer").join("session.json"))
    }

    /// Snapshot of the active credential.
    pub fn get(&self) -> Option<Arc<Credential>> {
        self.current.read().clone()
    }

    /// Replace the active credential and persist it. Returns the stored
    /// snapshot.
    pub fn set(&self, cred: Credential) -> Arc<Credential> {
        let cred = Arc::new(cred);
        *self.current.write() = Some(cred.clone());
        self.persist(&cred);
        cred
    }

    /// Drop the active credential and its persisted document.
    pub fn clear(&self) {
        *self.current.write() = None;
        if let Some(path) = &self.storage_path {
            if path.exists() {
                if let Err(err) = fs::remove_file(path) {
                    warn!(%err, "failed to remove session document");
                }
            }
        }
    }

    fn load_persisted(&self, path: &Path) -> Result<Credential> {
        let raw = fs::read_to_string(path)?;
        let session: PersistedSession = serde_json::from_str(&raw)?;
        let claims = decode_claims(&session.token)?;
        Ok(Credential {
            expires_at: claims.exp,
            issued_at: claims.iat,
            principal: session.user.unwrap_or_else(|| claims.principal()),
            token: session.token,
        })
    }

    fn persist(&self, cred: &Credential) {
        let Some(path) = &self.storage_path else {
            return;
        };
        let doc = PersistedSession {
            token: cred.token.clone(),
            user: Some(cred.principal.clone()),
        };
        match serde_json::to_string_pretty(&doc) {
            Ok(json) => {
                if let Err(err) = fs::write(path, json) {
                    warn!(%err, "failed to persist session document");
                }
            }
            Err(err) => warn!(%err, "failed to serialize session document"),
        }
    }
}
