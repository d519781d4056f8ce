//! Authentication and session management.
//!
//! This module provides the session subsystem shared by every deployment:
//! - [`AuthBackend`]: core trait a concrete backend implements
//! - [`AuthCoordinator`]: orchestrates login/logout/refresh flows and is
//!   the single mutator of the [`SessionStore`]
//! - [`SessionStore`]: observable "current identity or none" state
//! - [`RouteGuard`]: navigation gatekeeper for protected views
//!
//! For an HTTP-based backend implementation, see the `planhub-reqwest`
//! crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use planhub_core::{AuthCoordinator, SessionStore};
//!
//! let store = SessionStore::new();
//! let coordinator = AuthCoordinator::new(my_backend, store.clone());
//!
//! coordinator.login_with_password("user@example.com", "secret").await?;
//! assert!(coordinator.is_logged_in());
//! ```

mod coordinator;
mod guard;
mod store;

pub mod token;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

use serde::{Deserialize, Serialize};

pub use coordinator::{AuthCoordinator, AuthPhase, PhaseSubscription};
pub use guard::{GuardDecision, RouteGuard};
pub use store::{SessionStore, Subscription};

pub use crate::error::{Error, Result};
use crate::types::Identity;

/// Tracing target for auth operations.
pub const TRACING_TARGET: &str = "planhub_core::auth";

/// Outcome of a successful login call against the backend.
///
/// Token-based backends return the bearer token in the body; cookie-based
/// backends return an empty body and set an HttpOnly cookie the client
/// never sees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginOutcome {
    /// Bearer token, when the deployment uses token-based auth.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Core trait for authentication backends.
///
/// One concrete backend is chosen per deployment; the coordinator is
/// polymorphic over this capability set and never branches on which
/// implementation it holds.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a session. The identifier arrives
    /// already normalized (trimmed, lowercased).
    async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome>;

    /// Requests a magic sign-in link. The effect completes out-of-band;
    /// no session state changes here.
    async fn send_magic_link(&self, identifier: &str) -> Result<()>;

    /// Invalidates the server-side credential. Idempotent.
    async fn logout(&self) -> Result<()>;

    /// Changes the password of the currently authenticated principal.
    async fn change_password(&self, new_secret: &str) -> Result<()>;

    /// Fetches an identity by its server-assigned id.
    async fn fetch_identity(&self, subject: &str) -> Result<Identity>;

    /// Re-establishes the identity from whatever credential the backend
    /// still holds (held token, surviving HttpOnly cookie).
    async fn refresh_identity(&self) -> Result<Identity>;

    /// Returns the bearer token currently held in memory, if any.
    fn access_token(&self) -> Option<String>;

    /// Whether a credential reference exists that a refresh could use.
    ///
    /// Bearer backends report a held token; cookie backends report
    /// whether the ambient cookie jar holds a credential for the
    /// configured origin.
    fn has_credential(&self) -> bool {
        self.access_token().is_some()
    }
}
