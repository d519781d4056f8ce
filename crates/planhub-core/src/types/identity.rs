//! The authenticated principal and the session value built around it.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// The authenticated principal's stable attributes.
///
/// Owned by the session store and replaced wholesale on every login,
/// refresh or logout. Nothing outside the auth coordinator partially
/// mutates an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque server-assigned id, stable across sessions.
    pub id: String,
    /// Email address the principal signed in with.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub username: Option<String>,
    /// Avatar reference, if one is set.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// When the backend last updated this record.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Identity {
    /// Creates an identity with only the server-assigned id set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            username: None,
            avatar_url: None,
            updated_at: None,
        }
    }
}

/// The current authenticated session.
///
/// At most one session value exists process-wide at any time; the
/// session store's value is `Option<Session>`, with `None` meaning
/// unauthenticated. The bearer token, when present, lives in memory
/// only for the lifetime of the session and is never written to
/// durable storage by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The authenticated principal.
    pub identity: Identity,
    /// Bearer token returned by the backend, absent on cookie-based
    /// deployments.
    pub access_token: Option<String>,
}

impl Session {
    /// Creates a session without a bearer token (cookie-based backend).
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            access_token: None,
        }
    }

    /// Creates a session holding a bearer token.
    pub fn with_token(identity: Identity, access_token: impl Into<String>) -> Self {
        Self {
            identity,
            access_token: Some(access_token.into()),
        }
    }
}
