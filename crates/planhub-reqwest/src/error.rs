//! Internal error types for planhub-reqwest.

use thiserror::Error;

/// Result type alias for planhub-reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for planhub-reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Endpoint URL construction failed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<Error> for planhub_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    planhub_core::Error::network_error()
                        .with_message("Request timed out")
                        .with_source(e)
                } else if e.is_connect() {
                    planhub_core::Error::network_error()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    planhub_core::Error::serialization()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    planhub_core::Error::network_error()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Serde(e) => planhub_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::Url(e) => planhub_core::Error::configuration()
                .with_message(e.to_string())
                .with_source(e),
        }
    }
}
