//! Mock backend for unit and integration testing.
//!
//! Available behind the `test-utils` feature. The mock returns
//! configurable canned outcomes and counts every call so tests can
//! assert properties like "exactly one refresh attempt per navigation"
//! without any HTTP machinery.
//!
//! # Example
//!
//! ```rust,ignore
//! use planhub_core::auth::mock::MockBackend;
//! use planhub_core::types::Identity;
//!
//! let backend = MockBackend::new(Identity::new("u1"))
//!     .with_credentials("user@example.com", "correctpw")
//!     .with_access_token(MockBackend::token_for_subject("u1"));
//! ```

use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use super::{AuthBackend, LoginOutcome};
use crate::error::{Error, ErrorKind, Result};
use crate::types::Identity;

#[derive(Debug, Default, Clone, Copy)]
struct CallCounts {
    login: usize,
    magic_link: usize,
    logout: usize,
    change_password: usize,
    fetch_identity: usize,
    refresh_identity: usize,
}

#[derive(Debug)]
struct MockState {
    identity: Identity,
    /// Identifier/secret pair accepted by `login`; anything else is
    /// rejected. `None` accepts any non-empty pair.
    credentials: Option<(String, String)>,
    /// Token returned by `login` and held afterwards.
    issued_token: Option<String>,
    /// Simulates a surviving HttpOnly cookie for cookie deployments.
    cookie_credential: bool,
    held_token: Option<String>,
    login_error: Option<ErrorKind>,
    refresh_error: Option<ErrorKind>,
    logout_error: Option<ErrorKind>,
    counts: CallCounts,
}

/// Configurable mock implementation of [`AuthBackend`].
#[derive(Clone, Debug)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Creates a mock backend that authenticates as the given identity.
    pub fn new(identity: Identity) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                identity,
                credentials: None,
                issued_token: None,
                cookie_credential: false,
                held_token: None,
                login_error: None,
                refresh_error: None,
                logout_error: None,
                counts: CallCounts::default(),
            })),
        }
    }

    /// Builds an unsigned bearer token whose payload carries the given
    /// subject, shaped like the real three-segment tokens the backend
    /// issues.
    pub fn token_for_subject(subject: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{subject}"}}"#));
        format!("{header}.{payload}.mock-signature")
    }

    /// Accepts only this identifier/secret pair for `login`.
    pub fn with_credentials(self, identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        self.state.lock().unwrap().credentials = Some((identifier.into(), secret.into()));
        self
    }

    /// Makes `login` return this bearer token (token-based deployment).
    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        self.state.lock().unwrap().issued_token = Some(token.into());
        self
    }

    /// Simulates a surviving HttpOnly cookie (cookie-based deployment).
    pub fn with_cookie_credential(self) -> Self {
        self.state.lock().unwrap().cookie_credential = true;
        self
    }

    /// Switches the identity this backend authenticates as, e.g. to
    /// simulate a second login as a different principal.
    pub fn set_identity(&self, identity: Identity) {
        self.state.lock().unwrap().identity = identity;
    }

    /// Switches the token issued on subsequent `login` calls.
    pub fn set_access_token(&self, token: impl Into<String>) {
        self.state.lock().unwrap().issued_token = Some(token.into());
    }

    /// Makes the next `login` calls fail with the given kind.
    pub fn fail_login(&self, kind: ErrorKind) {
        self.state.lock().unwrap().login_error = Some(kind);
    }

    /// Makes `refresh_identity` calls fail with the given kind.
    pub fn fail_refresh(&self, kind: ErrorKind) {
        self.state.lock().unwrap().refresh_error = Some(kind);
    }

    /// Makes `logout` calls fail with the given kind. Local clearing in
    /// the coordinator must still happen.
    pub fn fail_logout(&self, kind: ErrorKind) {
        self.state.lock().unwrap().logout_error = Some(kind);
    }

    /// Number of `login` calls observed.
    pub fn login_calls(&self) -> usize {
        self.state.lock().unwrap().counts.login
    }

    /// Number of `send_magic_link` calls observed.
    pub fn magic_link_calls(&self) -> usize {
        self.state.lock().unwrap().counts.magic_link
    }

    /// Number of `logout` calls observed.
    pub fn logout_calls(&self) -> usize {
        self.state.lock().unwrap().counts.logout
    }

    /// Number of `fetch_identity` calls observed.
    pub fn fetch_identity_calls(&self) -> usize {
        self.state.lock().unwrap().counts.fetch_identity
    }

    /// Number of `refresh_identity` calls observed.
    pub fn refresh_identity_calls(&self) -> usize {
        self.state.lock().unwrap().counts.refresh_identity
    }
}

#[async_trait::async_trait]
impl AuthBackend for MockBackend {
    async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome> {
        let mut state = self.state.lock().unwrap();
        state.counts.login += 1;

        if let Some(kind) = state.login_error {
            return Err(Error::new(kind).with_message("mock login failure"));
        }
        if let Some((expected_identifier, expected_secret)) = &state.credentials {
            if identifier != expected_identifier || secret != expected_secret {
                return Err(Error::invalid_credentials().with_message("mock rejected credentials"));
            }
        }

        state.held_token = state.issued_token.clone();
        if state.issued_token.is_none() {
            // Cookie deployment: login sets the ambient cookie.
            state.cookie_credential = true;
        }
        Ok(LoginOutcome {
            access_token: state.issued_token.clone(),
        })
    }

    async fn send_magic_link(&self, _identifier: &str) -> Result<()> {
        self.state.lock().unwrap().counts.magic_link += 1;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.counts.logout += 1;
        state.held_token = None;
        state.cookie_credential = false;
        match state.logout_error {
            Some(kind) => Err(Error::new(kind).with_message("mock logout failure")),
            None => Ok(()),
        }
    }

    async fn change_password(&self, _new_secret: &str) -> Result<()> {
        self.state.lock().unwrap().counts.change_password += 1;
        Ok(())
    }

    async fn fetch_identity(&self, subject: &str) -> Result<Identity> {
        let mut state = self.state.lock().unwrap();
        state.counts.fetch_identity += 1;
        if subject == state.identity.id {
            Ok(state.identity.clone())
        } else {
            Err(Error::not_found().with_message(format!("no identity {subject}")))
        }
    }

    async fn refresh_identity(&self) -> Result<Identity> {
        let mut state = self.state.lock().unwrap();
        state.counts.refresh_identity += 1;
        if let Some(kind) = state.refresh_error {
            return Err(Error::new(kind).with_message("mock refresh failure"));
        }
        if state.held_token.is_none() && !state.cookie_credential {
            return Err(Error::invalid_credentials().with_message("no mock credential"));
        }
        Ok(state.identity.clone())
    }

    fn access_token(&self) -> Option<String> {
        self.state.lock().unwrap().held_token.clone()
    }

    fn has_credential(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.held_token.is_some() || state.cookie_credential
    }
}
