//! Orchestration of login, logout and refresh flows.

use std::fmt;
use std::sync::Arc;

use super::store::{CellSubscription, ObservableCell, SessionStore};
use super::{AuthBackend, TRACING_TARGET, token};
use crate::error::{Error, Result};
use crate::types::{Identity, Session};

/// Coordinator phase, observable so subscribers can render a loading
/// indicator deterministically.
///
/// Every login or refresh attempt passes through [`AuthPhase::Authenticating`],
/// even ones that fail before reaching the network; there is no direct
/// `LoggedOut -> LoggedIn` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AuthPhase {
    /// No authenticated session.
    LoggedOut,
    /// A login or refresh attempt is in flight.
    Authenticating,
    /// A session is established.
    LoggedIn,
}

/// Orchestrates authentication flows against a pluggable [`AuthBackend`]
/// and owns all mutations of the [`SessionStore`].
///
/// Operations are fire-to-completion: once started they run to their
/// terminal state even if the caller stops listening. Each completed
/// operation issues at most one session-store update, never a partial
/// one.
///
/// Nothing here persists across a process restart — a restart is a
/// silent logout. On cookie deployments the surviving HttpOnly cookie
/// lets [`refresh_session`](Self::refresh_session) re-establish the
/// identity; deployments that want durable rehydration call
/// [`rehydrate`](Self::rehydrate) once at startup from their own,
/// explicitly lower-trust storage.
pub struct AuthCoordinator {
    backend: Arc<dyn AuthBackend>,
    store: SessionStore,
    phase: ObservableCell<AuthPhase>,
}

impl fmt::Debug for AuthCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCoordinator")
            .field("phase", &self.phase.current())
            .finish_non_exhaustive()
    }
}

impl AuthCoordinator {
    /// Creates a coordinator over the given backend and session store.
    pub fn new<B>(backend: B, store: SessionStore) -> Self
    where
        B: AuthBackend + 'static,
    {
        Self {
            backend: Arc::new(backend),
            store,
            phase: ObservableCell::new(AuthPhase::LoggedOut),
        }
    }

    /// Logs in with an identifier and secret.
    ///
    /// The identifier is normalized (trimmed, lowercased) before it is
    /// sent. Empty credentials fail with `InvalidCredentials` before any
    /// network call. On token-based backends the subject is decoded from
    /// the returned token and the identity fetched by id; a token that
    /// cannot be decoded fails with `MalformedToken`. On cookie-based
    /// backends the identity comes from the backend's refresh channel.
    pub async fn login_with_password(&self, identifier: &str, secret: &str) -> Result<()> {
        let normalized = identifier.trim().to_ascii_lowercase();
        self.phase.set(AuthPhase::Authenticating);

        let result = self.attempt_login(&normalized, secret).await;
        match result {
            Ok(session) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    subject = %session.identity.id,
                    has_token = session.access_token.is_some(),
                    "Login succeeded"
                );
                self.store.set(Some(session));
                self.phase.set(AuthPhase::LoggedIn);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    kind = ?error.kind,
                    "Login failed"
                );
                self.store.set(None);
                self.phase.set(AuthPhase::LoggedOut);
                Err(error)
            }
        }
    }

    async fn attempt_login(&self, identifier: &str, secret: &str) -> Result<Session> {
        if identifier.is_empty() || secret.is_empty() {
            return Err(Error::invalid_credentials()
                .with_message("identifier and secret must be provided"));
        }

        let outcome = self.backend.login(identifier, secret).await?;

        match outcome.access_token {
            Some(access_token) => {
                let subject = token::decode_subject(&access_token).ok_or_else(|| {
                    Error::malformed_token()
                        .with_message("login returned a token without a readable subject")
                })?;
                let identity = self.backend.fetch_identity(&subject).await?;
                Ok(Session::with_token(identity, access_token))
            }
            None => {
                // Cookie-based deployment: the credential is invisible to
                // client code, so ask the backend who we are.
                let identity = self.backend.refresh_identity().await?;
                Ok(Session::new(identity))
            }
        }
    }

    /// Requests a magic sign-in link for the identifier.
    ///
    /// Side-channel only: the session is not mutated here. The flow
    /// completes out-of-band when the user follows the emailed link.
    pub async fn send_magic_link(&self, identifier: &str) -> Result<()> {
        let normalized = identifier.trim().to_ascii_lowercase();
        if !is_plausible_email(&normalized) {
            return Err(Error::invalid_email_format()
                .with_message("identifier is not a valid email address"));
        }

        tracing::debug!(target: TRACING_TARGET, "Requesting magic link");
        self.backend.send_magic_link(&normalized).await
    }

    /// Logs out.
    ///
    /// The local session is cleared unconditionally, before the server
    /// response is inspected: local state must never keep pointing at a
    /// credential the server may already have revoked. A failing server
    /// call is reported to the caller after the clear.
    pub async fn logout(&self) -> Result<()> {
        tracing::debug!(target: TRACING_TARGET, "Logging out");
        let result = self.backend.logout().await;

        self.store.set(None);
        self.phase.set(AuthPhase::LoggedOut);

        if let Err(error) = &result {
            tracing::warn!(
                target: TRACING_TARGET,
                kind = ?error.kind,
                "Server logout failed; local session cleared anyway"
            );
        }
        result
    }

    /// Attempts to re-establish a session from a still-valid credential,
    /// e.g. after a page reload on a cookie deployment.
    ///
    /// Fails fast with `NoStoredCredential` when no credential reference
    /// exists at all; never silently succeeds with a stale identity.
    pub async fn refresh_session(&self) -> Result<()> {
        if !self.backend.has_credential() {
            return Err(Error::no_stored_credential());
        }

        self.phase.set(AuthPhase::Authenticating);
        match self.backend.refresh_identity().await {
            Ok(identity) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    subject = %identity.id,
                    "Session refreshed"
                );
                let session = match self.backend.access_token() {
                    Some(access_token) => Session::with_token(identity, access_token),
                    None => Session::new(identity),
                };
                self.store.set(Some(session));
                self.phase.set(AuthPhase::LoggedIn);
                Ok(())
            }
            Err(error) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    kind = ?error.kind,
                    "Session refresh failed"
                );
                self.store.set(None);
                self.phase.set(AuthPhase::LoggedOut);
                Err(error)
            }
        }
    }

    /// Changes the password of the currently authenticated principal.
    pub async fn change_password(&self, new_secret: &str) -> Result<()> {
        if !self.is_logged_in() {
            return Err(Error::not_signed_in());
        }
        if new_secret.is_empty() {
            return Err(Error::invalid_credentials().with_message("new password must not be empty"));
        }
        self.backend.change_password(new_secret).await
    }

    /// Seeds the session once at startup from deployment-managed storage.
    ///
    /// This is the only sanctioned path for durable rehydration, and it
    /// is an explicitly lower-trust concern: whatever storage the
    /// deployment read this session from is outside this crate's
    /// security envelope.
    pub fn rehydrate(&self, session: Session) {
        tracing::debug!(
            target: TRACING_TARGET,
            subject = %session.identity.id,
            "Rehydrating session from deployment storage"
        );
        self.store.set(Some(session));
        self.phase.set(AuthPhase::LoggedIn);
    }

    /// Whether a session is currently established. Pure, synchronous
    /// read; never triggers network activity.
    pub fn is_logged_in(&self) -> bool {
        self.store.current().is_some()
    }

    /// Snapshot of the current identity, if any. Pure, synchronous read.
    pub fn current_identity(&self) -> Option<Identity> {
        self.store.current().map(|session| session.identity)
    }

    /// Snapshot of the coordinator phase.
    pub fn phase(&self) -> AuthPhase {
        self.phase.current()
    }

    /// Registers a listener for phase transitions, with replay-of-one
    /// semantics matching [`SessionStore::subscribe`].
    pub fn subscribe_phase<F>(&self, listener: F) -> PhaseSubscription
    where
        F: Fn(&AuthPhase) + Send + Sync + 'static,
    {
        PhaseSubscription {
            _inner: self.phase.subscribe(listener),
        }
    }

    /// The session store this coordinator mutates.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

/// Subscription handle returned by [`AuthCoordinator::subscribe_phase`];
/// unsubscribes on drop.
pub struct PhaseSubscription {
    _inner: CellSubscription<AuthPhase>,
}

/// Structural email check: `local@domain` with a dotted domain. Local
/// validation only; the server stays authoritative.
fn is_plausible_email(identifier: &str) -> bool {
    match identifier.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::auth::mock::MockBackend;
    use crate::error::ErrorKind;

    fn coordinator(backend: MockBackend) -> AuthCoordinator {
        AuthCoordinator::new(backend, SessionStore::new())
    }

    #[tokio::test]
    async fn test_password_login_with_bearer_token() {
        let mut identity = Identity::new("u1");
        identity.email = Some("user@example.com".to_string());
        let backend = MockBackend::new(identity)
            .with_credentials("user@example.com", "correctpw")
            .with_access_token(MockBackend::token_for_subject("u1"));
        let coordinator = coordinator(backend.clone());

        coordinator
            .login_with_password("user@example.com", "correctpw")
            .await
            .unwrap();

        assert!(coordinator.is_logged_in());
        assert_eq!(coordinator.phase(), AuthPhase::LoggedIn);
        let identity = coordinator.current_identity().unwrap();
        assert_eq!(identity.id, "u1");
        assert_eq!(identity.email.as_deref(), Some("user@example.com"));
        assert_eq!(backend.fetch_identity_calls(), 1);
        // The identity came from the decoded subject, not the refresh channel.
        assert_eq!(backend.refresh_identity_calls(), 0);
    }

    #[tokio::test]
    async fn test_password_login_normalizes_identifier() {
        let backend = MockBackend::new(Identity::new("u1"))
            .with_credentials("user@example.com", "pw")
            .with_access_token(MockBackend::token_for_subject("u1"));
        let coordinator = coordinator(backend);

        coordinator
            .login_with_password("  User@Example.COM ", "pw")
            .await
            .unwrap();
        assert!(coordinator.is_logged_in());
    }

    #[tokio::test]
    async fn test_cookie_login_uses_refresh_channel() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend.clone());

        coordinator
            .login_with_password("user@example.com", "pw")
            .await
            .unwrap();

        assert!(coordinator.is_logged_in());
        assert!(coordinator.current_identity().is_some());
        assert!(coordinator.store().current().unwrap().access_token.is_none());
        assert_eq!(backend.refresh_identity_calls(), 1);
        assert_eq!(backend.fetch_identity_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_secret_fails_before_any_network_call() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend.clone());

        let error = coordinator
            .login_with_password("user@example.com", "")
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::InvalidCredentials);
        assert_eq!(backend.login_calls(), 0);
        assert!(!coordinator.is_logged_in());
        assert!(coordinator.store().current().is_none());
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_session_cleared() {
        let backend = MockBackend::new(Identity::new("u1"))
            .with_credentials("user@example.com", "correctpw");
        let coordinator = coordinator(backend);

        let error = coordinator
            .login_with_password("user@example.com", "wrongpw")
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::InvalidCredentials);
        assert!(!coordinator.is_logged_in());
        assert_eq!(coordinator.phase(), AuthPhase::LoggedOut);
    }

    #[tokio::test]
    async fn test_undecodable_token_fails_as_malformed() {
        let backend =
            MockBackend::new(Identity::new("u1")).with_access_token("only-one-segment");
        let coordinator = coordinator(backend.clone());

        let error = coordinator
            .login_with_password("user@example.com", "pw")
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::MalformedToken);
        assert!(!coordinator.is_logged_in());
        assert_eq!(backend.fetch_identity_calls(), 0);
    }

    #[tokio::test]
    async fn test_login_passes_through_authenticating_phase() {
        let backend = MockBackend::new(Identity::new("u1"))
            .with_access_token(MockBackend::token_for_subject("u1"));
        let coordinator = coordinator(backend);

        let phases = std::sync::Arc::new(Mutex::new(Vec::new()));
        let phases_by_listener = std::sync::Arc::clone(&phases);
        let _sub = coordinator.subscribe_phase(move |phase| {
            phases_by_listener.lock().unwrap().push(*phase);
        });

        coordinator
            .login_with_password("user@example.com", "pw")
            .await
            .unwrap();

        assert_eq!(
            phases.lock().unwrap().as_slice(),
            &[
                AuthPhase::LoggedOut,
                AuthPhase::Authenticating,
                AuthPhase::LoggedIn
            ]
        );
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_when_server_call_fails() {
        let backend = MockBackend::new(Identity::new("u1"))
            .with_access_token(MockBackend::token_for_subject("u1"));
        let coordinator = coordinator(backend.clone());
        coordinator
            .login_with_password("user@example.com", "pw")
            .await
            .unwrap();

        backend.fail_logout(ErrorKind::NetworkError);
        let result = coordinator.logout().await;

        assert!(result.is_err());
        assert!(!coordinator.is_logged_in());
        assert_eq!(coordinator.phase(), AuthPhase::LoggedOut);
        assert!(coordinator.store().current().is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_credential_fails_fast() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend.clone());

        let error = coordinator.refresh_session().await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::NoStoredCredential);
        assert_eq!(backend.refresh_identity_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_with_surviving_cookie_restores_session() {
        let backend = MockBackend::new(Identity::new("u1")).with_cookie_credential();
        let coordinator = coordinator(backend);

        coordinator.refresh_session().await.unwrap();

        assert!(coordinator.is_logged_in());
        assert_eq!(coordinator.current_identity().unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session() {
        let backend = MockBackend::new(Identity::new("u1")).with_cookie_credential();
        backend.fail_refresh(ErrorKind::InvalidCredentials);
        let coordinator = coordinator(backend);

        let error = coordinator.refresh_session().await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::InvalidCredentials);
        assert!(!coordinator.is_logged_in());
        assert_eq!(coordinator.phase(), AuthPhase::LoggedOut);
    }

    #[tokio::test]
    async fn test_sequential_logins_replace_identity_wholesale() {
        let backend = MockBackend::new(Identity::new("u1"))
            .with_access_token(MockBackend::token_for_subject("u1"));
        let store = SessionStore::new();
        let coordinator = AuthCoordinator::new(backend.clone(), store.clone());

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_by_listener = std::sync::Arc::clone(&seen);
        let _sub = store.subscribe(move |session| {
            seen_by_listener
                .lock()
                .unwrap()
                .push(session.as_ref().map(|s| s.identity.id.clone()));
        });

        coordinator
            .login_with_password("first@example.com", "pw")
            .await
            .unwrap();

        backend.set_identity(Identity::new("u2"));
        backend.set_access_token(MockBackend::token_for_subject("u2"));
        coordinator
            .login_with_password("second@example.com", "pw")
            .await
            .unwrap();

        // Replay, then one full session per completed login; never a
        // partial or merged value.
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[None, Some("u1".to_string()), Some("u2".to_string())]
        );
        assert_eq!(store.current().unwrap().identity.id, "u2");
    }

    #[tokio::test]
    async fn test_magic_link_does_not_mutate_session() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend.clone());

        coordinator
            .send_magic_link("user@example.com")
            .await
            .unwrap();

        assert!(!coordinator.is_logged_in());
        assert_eq!(coordinator.phase(), AuthPhase::LoggedOut);
        assert_eq!(backend.magic_link_calls(), 1);
    }

    #[tokio::test]
    async fn test_magic_link_rejects_malformed_email_locally() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend.clone());

        let error = coordinator.send_magic_link("not-an-email").await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::InvalidEmailFormat);
        assert_eq!(backend.magic_link_calls(), 0);
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend);

        let error = coordinator.change_password("newpw").await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotSignedIn);
    }

    #[tokio::test]
    async fn test_rehydrate_establishes_session_without_network() {
        let backend = MockBackend::new(Identity::new("u1"));
        let coordinator = coordinator(backend.clone());

        coordinator.rehydrate(Session::new(Identity::new("u9")));

        assert!(coordinator.is_logged_in());
        assert_eq!(coordinator.current_identity().unwrap().id, "u9");
        assert_eq!(coordinator.phase(), AuthPhase::LoggedIn);
        assert_eq!(backend.login_calls(), 0);
        assert_eq!(backend.refresh_identity_calls(), 0);
    }

    #[test]
    fn test_plausible_email_accepts_normal_addresses() {
        assert!(is_plausible_email("user@example.com"));
        assert!(is_plausible_email("a.b+c@sub.example.org"));
    }

    #[test]
    fn test_plausible_email_rejects_malformed_addresses() {
        assert!(!is_plausible_email(""));
        assert!(!is_plausible_email("user"));
        assert!(!is_plausible_email("user@"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("user@localhost"));
        assert!(!is_plausible_email("user@.com"));
        assert!(!is_plausible_email("user@com."));
    }
}
