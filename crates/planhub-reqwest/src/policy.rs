//! Outbound credential attachment policy.

use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use url::Url;

/// Tracing target for request policy decisions.
pub const TRACING_TARGET: &str = "planhub_reqwest::policy";

/// How credentials travel to the backend origin.
///
/// Fixed per deployment; exactly one mode applies to a given backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CredentialMode {
    /// The ambient HttpOnly cookie carries the credential; requests add
    /// no auth header.
    Cookie,
    /// A bearer token held in memory is attached as an `Authorization`
    /// header when present; requests go out unauthenticated otherwise.
    Bearer,
}

/// Decides credential attachment for outgoing requests.
///
/// Credentials are attached only to requests whose origin (scheme, host,
/// port) equals the configured backend origin; anything else receives
/// neither cookie nor header, so credentials never leak to third-party
/// hosts.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    origin: Url,
    mode: CredentialMode,
}

impl RequestPolicy {
    /// Creates a policy for the given backend origin and mode.
    pub fn new(origin: Url, mode: CredentialMode) -> Self {
        Self { origin, mode }
    }

    /// The configured credential mode.
    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    /// Whether the URL targets the backend origin.
    pub fn is_backend_origin(&self, url: &Url) -> bool {
        url.scheme() == self.origin.scheme()
            && url.host() == self.origin.host()
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }

    /// Applies the policy to an outgoing request.
    ///
    /// In bearer mode with a held token and a backend-origin URL, adds
    /// the `Authorization` header. Cookie mode adds nothing here: the
    /// client-level cookie store scopes the cookie to its origin on its
    /// own.
    pub fn apply(
        &self,
        url: &Url,
        request: RequestBuilder,
        token: Option<&str>,
    ) -> RequestBuilder {
        if !self.is_backend_origin(url) {
            tracing::warn!(
                target: TRACING_TARGET,
                url = %url,
                "Request leaves the backend origin; sending without credentials"
            );
            return request;
        }
        match (self.mode, token) {
            (CredentialMode::Bearer, Some(token)) => {
                request.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            _ => request,
        }
    }
}
