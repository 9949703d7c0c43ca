//! The authenticated session record.
//!
//! A [`Credential`] is the single source of truth for "who is logged in".
//! It is owned by the credential store in the transport crate; everything
//! else reads immutable snapshots. At most one credential is active per
//! session, and every mutation replaces the whole value.

use serde::{Deserialize, Serialize};

/// Tokens longer than this are treated as corrupt and purged without ever
/// being sent: an oversized token risks producing a request header the
/// transport cannot safely send.
pub const MAX_TOKEN_CHARS: usize = 4000;

/// A token within this many seconds of expiry is refreshed proactively.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Access role carried in the token payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Traveler,
    Agent,
    Admin,
}

impl Role {
    /// Parse a role string from a token payload or user object.
    ///
    /// Unknown or missing roles fall back to the least-privileged role.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "agent" => Role::Agent,
            _ => Role::Traveler,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Traveler
    }
}

/// The user identity derived from the token payload (or the login response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

/// The active authentication credential.
///
/// `expires_at` and `issued_at` are epoch seconds taken from the token's
/// `exp`/`iat` claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub expires_at: i64,
    pub issued_at: i64,
    pub principal: Principal,
}

impl Credential {
    /// Seconds of validity remaining at `now` (epoch seconds). Negative once
    /// expired.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_at - now
    }
}

/// Claims decoded from the token's payload segment.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Build a principal from the claims, defaulting the role when absent.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            role: self.role.as_deref().map(Role::parse).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive_and_fails_closed() {
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse("AGENT"), Role::Agent);
        assert_eq!(Role::parse("traveler"), Role::Traveler);
        assert_eq!(Role::parse("superuser"), Role::Traveler);
    }

    #[test]
    fn remaining_secs_goes_negative_after_expiry() {
        let cred = Credential {
            token: "a.b.c".to_string(),
            expires_at: 1_000,
            issued_at: 0,
            principal: Principal {
                id: "u1".to_string(),
                role: Role::Traveler,
            },
        };
        assert_eq!(cred.remaining_secs(400), 600);
        assert_eq!(cred.remaining_secs(1_200), -200);
    }
}
