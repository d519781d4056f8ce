//! HTTP backend implementation using reqwest.

use std::fmt;
use std::sync::{Arc, RwLock};

use planhub_core::auth::token::decode_subject;
use planhub_core::{AuthBackend, Identity, LoginOutcome};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ApiConfig;
use crate::error::Error;
use crate::policy::{CredentialMode, RequestPolicy};

/// Tracing target for API client operations.
pub const TRACING_TARGET: &str = "planhub_reqwest::client";

/// Inner client that holds the HTTP client and configuration.
struct ClientInner {
    http: Client,
    config: ApiConfig,
    base_url: Url,
    policy: RequestPolicy,
    cookies: Arc<Jar>,
    /// Bearer token held in memory for the session lifetime; never
    /// written to durable storage.
    token: RwLock<Option<String>>,
}

impl fmt::Debug for ClientInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientInner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// HTTP client for the planhub REST API.
///
/// Implements [`AuthBackend`] against the `/auth` and `/identities`
/// endpoints and carries the CRUD plumbing for the data services.
/// Cheap to clone; all clones share the same connection pool, cookie
/// store and token slot.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("mode", &self.inner.policy.mode())
            .finish_non_exhaustive()
    }
}

/// Error body shape returned by the backend on failures.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

impl ApiClient {
    /// Creates a new API client from a configuration.
    ///
    /// In cookie mode the client owns a cookie store that receives the
    /// HttpOnly session cookie; in bearer mode tokens are attached per
    /// request by the outbound policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> planhub_core::Result<Self> {
        config.validate()?;
        let base_url = config.normalized_base_url();
        let policy = RequestPolicy::new(base_url.clone(), config.credential_mode);
        let cookies = Arc::new(Jar::default());

        tracing::debug!(
            target: TRACING_TARGET,
            base_url = %base_url,
            mode = %config.credential_mode,
            timeout_ms = config.effective_timeout().as_millis(),
            "Creating API client"
        );

        let mut builder = Client::builder()
            .timeout(config.effective_timeout())
            .user_agent(config.user_agent.as_str());
        if config.credential_mode == CredentialMode::Cookie {
            builder = builder.cookie_provider(Arc::clone(&cookies));
        }
        let http = builder.build().map_err(|e| {
            planhub_core::Error::configuration()
                .with_message("failed to build HTTP client")
                .with_source(e)
        })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                base_url,
                policy,
                cookies,
                token: RwLock::new(None),
            }),
        })
    }

    /// The client configuration.
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The outbound credential policy.
    pub fn policy(&self) -> &RequestPolicy {
        &self.inner.policy
    }

    /// Builds an endpoint URL from path segments. Segments are appended
    /// individually so ids containing reserved characters are
    /// percent-encoded rather than reinterpreted as path structure.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .expect("base URL was validated to be a base");
            parts.pop_if_empty();
            for segment in segments {
                parts.push(segment);
            }
        }
        url
    }

    fn held_token(&self) -> Option<String> {
        self.inner.token.read().expect("token slot lock").clone()
    }

    fn store_token(&self, token: Option<String>) {
        *self.inner.token.write().expect("token slot lock") = token;
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&(impl Serialize + ?Sized)>,
    ) -> planhub_core::Result<Response> {
        let token = self.held_token();
        let mut request = self.inner.http.request(method, url.clone());
        request = self.inner.policy.apply(&url, request, token.as_deref());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(Error::Reqwest)?;
        Ok(response)
    }

    /// Maps a non-success response to the error taxonomy, reading the
    /// server-provided message when one exists.
    async fn error_from_response(response: Response) -> planhub_core::Error {
        let status = response.status();
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {status}"));

        let error = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                planhub_core::Error::invalid_credentials()
            }
            StatusCode::NOT_FOUND => planhub_core::Error::not_found(),
            s if s.is_server_error() => planhub_core::Error::network_error(),
            _ => planhub_core::Error::unknown(),
        };
        error.with_message(message)
    }

    async fn expect_success(response: Response) -> planhub_core::Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> planhub_core::Result<T> {
        let url = self.endpoint(segments);
        let response = self.send(Method::GET, url, None::<&()>).await?;
        let response = Self::expect_success(response).await?;
        response.json().await.map_err(|e| Error::Reqwest(e).into())
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> planhub_core::Result<T> {
        let url = self.endpoint(segments);
        let response = self.send(Method::POST, url, Some(body)).await?;
        let response = Self::expect_success(response).await?;
        response.json().await.map_err(|e| Error::Reqwest(e).into())
    }

    pub(crate) async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> planhub_core::Result<T> {
        let url = self.endpoint(segments);
        let response = self.send(Method::PUT, url, Some(body)).await?;
        let response = Self::expect_success(response).await?;
        response.json().await.map_err(|e| Error::Reqwest(e).into())
    }

    pub(crate) async fn post_unit<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> planhub_core::Result<()> {
        let url = self.endpoint(segments);
        let response = self.send(Method::POST, url, Some(body)).await?;
        Self::expect_success(response).await.map(|_| ())
    }

    pub(crate) async fn delete(&self, segments: &[&str]) -> planhub_core::Result<()> {
        let url = self.endpoint(segments);
        let response = self.send(Method::DELETE, url, None::<&()>).await?;
        Self::expect_success(response).await.map(|_| ())
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct MagicLinkRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangePasswordRequest<'a> {
    password: &'a str,
}

#[async_trait::async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, identifier: &str, secret: &str) -> planhub_core::Result<LoginOutcome> {
        tracing::debug!(target: TRACING_TARGET, "Sending login request");
        let url = self.endpoint(&["auth", "login"]);
        let body = LoginRequest {
            email: identifier,
            password: secret,
        };
        let response = self.send(Method::POST, url, Some(&body)).await?;

        let status = response.status();
        if status.is_client_error() {
            // Any 4xx on login means the credentials were rejected.
            let error = Self::error_from_response(response).await;
            return Err(planhub_core::Error::invalid_credentials()
                .with_message(error.message.unwrap_or_else(|| format!("HTTP {status}"))));
        }
        let response = Self::expect_success(response).await?;

        let outcome: LoginOutcome = response.json().await.map_err(|e| {
            planhub_core::Error::from(Error::Reqwest(e))
        })?;
        self.store_token(outcome.access_token.clone());
        Ok(outcome)
    }

    async fn send_magic_link(&self, identifier: &str) -> planhub_core::Result<()> {
        self.post_unit(&["auth", "magic"], &MagicLinkRequest { email: identifier })
            .await
    }

    async fn logout(&self) -> planhub_core::Result<()> {
        tracing::debug!(target: TRACING_TARGET, "Sending logout request");
        let url = self.endpoint(&["auth", "logout"]);
        let result = self.send(Method::POST, url, Some(&serde_json::json!({}))).await;

        // The held token is dropped no matter how the server call went;
        // the server clears its cookie via Set-Cookie on success.
        self.store_token(None);

        let response = result?;
        Self::expect_success(response).await.map(|_| ())
    }

    async fn change_password(&self, new_secret: &str) -> planhub_core::Result<()> {
        self.post_unit(
            &["auth", "change-password"],
            &ChangePasswordRequest {
                password: new_secret,
            },
        )
        .await
    }

    async fn fetch_identity(&self, subject: &str) -> planhub_core::Result<Identity> {
        self.get_json(&["identities", subject]).await
    }

    async fn refresh_identity(&self) -> planhub_core::Result<Identity> {
        match self.held_token() {
            Some(token) => {
                let subject = decode_subject(&token).ok_or_else(|| {
                    planhub_core::Error::malformed_token()
                        .with_message("held token has no readable subject")
                })?;
                self.fetch_identity(&subject).await
            }
            None => match self.inner.policy.mode() {
                // Cookie deployments expose a who-am-I endpoint; the
                // cookie travels with the request.
                CredentialMode::Cookie => self.get_json(&["identities", "me"]).await,
                CredentialMode::Bearer => Err(planhub_core::Error::no_stored_credential()),
            },
        }
    }

    fn access_token(&self) -> Option<String> {
        self.held_token()
    }

    fn has_credential(&self) -> bool {
        match self.inner.policy.mode() {
            CredentialMode::Bearer => self.held_token().is_some(),
            CredentialMode::Cookie => {
                self.inner.cookies.cookies(&self.inner.base_url).is_some()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(mode: CredentialMode) -> ApiClient {
        let config = ApiConfig::new(Url::parse("https://api.planhub.app/api").unwrap())
            .with_credential_mode(mode);
        ApiClient::new(config).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = client(CredentialMode::Cookie);
        assert_eq!(client.config().credential_mode, CredentialMode::Cookie);
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = client(CredentialMode::Bearer);
        assert_eq!(
            client.endpoint(&["auth", "login"]).as_str(),
            "https://api.planhub.app/api/auth/login"
        );
    }

    #[test]
    fn test_endpoint_percent_encodes_hostile_ids() {
        // The subject id comes from an unverified token; it must never
        // rewrite the path structure.
        let client = client(CredentialMode::Bearer);
        let url = client.endpoint(&["identities", "../admin"]);
        assert_eq!(
            url.as_str(),
            "https://api.planhub.app/api/identities/..%2Fadmin"
        );
    }

    #[test]
    fn test_fresh_client_has_no_credential() {
        assert!(!client(CredentialMode::Bearer).has_credential());
        assert!(!client(CredentialMode::Cookie).has_credential());
        assert!(client(CredentialMode::Bearer).access_token().is_none());
    }

    #[test]
    fn test_token_slot_round_trip() {
        let client = client(CredentialMode::Bearer);
        client.store_token(Some("tok".to_string()));
        assert!(client.has_credential());
        assert_eq!(client.access_token().as_deref(), Some("tok"));

        client.store_token(None);
        assert!(!client.has_credential());
    }
}
