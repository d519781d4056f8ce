//! Configuration for the planhub HTTP client.

use std::time::Duration;

use url::Url;

use crate::policy::CredentialMode;

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the planhub HTTP client.
///
/// The credential mode is a fixed deployment choice, not a per-request
/// decision; mixing cookie and bearer transport against the same backend
/// is invalid configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend API base URL; the only required deployment value.
    pub base_url: Url,
    /// How credentials travel to the backend origin.
    pub credential_mode: CredentialMode,
    /// Default timeout for HTTP requests.
    pub timeout: Duration,
    /// User-Agent header to send with requests.
    pub user_agent: String,
}

impl ApiConfig {
    /// Creates a configuration for the given backend base URL, in cookie
    /// mode with default timeout and user agent.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credential_mode: CredentialMode::Cookie,
            timeout: DEFAULT_TIMEOUT,
            user_agent: Self::default_user_agent(),
        }
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("planhub/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Sets the credential mode.
    pub fn with_credential_mode(mut self, credential_mode: CredentialMode) -> Self {
        self.credential_mode = credential_mode;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), planhub_core::Error> {
        if self.base_url.cannot_be_a_base() {
            return Err(planhub_core::Error::configuration()
                .with_message("base_url cannot be used as a base URL"));
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(planhub_core::Error::configuration()
                .with_message("base_url must be an http(s) URL"));
        }
        Ok(())
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Returns the base URL normalized to end with a slash, so joining
    /// endpoint paths never drops the last path segment.
    pub(crate) fn normalized_base_url(&self) -> Url {
        if self.base_url.path().ends_with('/') {
            self.base_url.clone()
        } else {
            let mut normalized = self.base_url.clone();
            normalized.set_path(&format!("{}/", self.base_url.path()));
            normalized
        }
    }
}
