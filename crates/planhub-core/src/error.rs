//! Common error type definitions.

use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Commonly used as a source error in structured error types, wrapping any
/// error that implements the standard `Error` trait while keeping Send and
/// Sync bounds for multi-threaded contexts.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur in planhub client operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Login was rejected or required credentials were missing.
    InvalidCredentials,
    /// Identifier failed local email validation; never reaches the network.
    InvalidEmailFormat,
    /// The backend returned a token the client could not decode.
    MalformedToken,
    /// No credential reference exists to refresh a session from.
    NoStoredCredential,
    /// Network-related error occurred.
    NetworkError,
    /// An operation requiring a session was attempted without one.
    NotSignedIn,
    /// Resource not found.
    NotFound,
    /// Serialization/deserialization error.
    Serialization,
    /// Configuration error.
    Configuration,
    /// Unknown error occurred.
    Unknown,
}

/// A structured error type for planhub client operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid credentials error.
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::InvalidCredentials)
    }

    /// Creates a new invalid email format error.
    pub fn invalid_email_format() -> Self {
        Self::new(ErrorKind::InvalidEmailFormat)
    }

    /// Creates a new malformed token error.
    pub fn malformed_token() -> Self {
        Self::new(ErrorKind::MalformedToken)
    }

    /// Creates a new no stored credential error.
    pub fn no_stored_credential() -> Self {
        Self::new(ErrorKind::NoStoredCredential)
    }

    /// Creates a new network error.
    pub fn network_error() -> Self {
        Self::new(ErrorKind::NetworkError)
    }

    /// Creates a new not signed in error.
    pub fn not_signed_in() -> Self {
        Self::new(ErrorKind::NotSignedIn)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new unknown error.
    pub fn unknown() -> Self {
        Self::new(ErrorKind::Unknown)
    }

    /// Returns true if the user can recover by correcting their input and
    /// retrying the form.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidCredentials | ErrorKind::InvalidEmailFormat | ErrorKind::NetworkError
        )
    }

    /// Returns true if this error relates to the session or credential state.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidCredentials | ErrorKind::NoStoredCredential | ErrorKind::NotSignedIn
        )
    }

    /// Returns true if this is an expected state rather than a fault, and
    /// should be handled silently (e.g. a guard redirect) instead of being
    /// surfaced to the user.
    pub fn is_benign(&self) -> bool {
        matches!(self.kind, ErrorKind::NoStoredCredential)
    }

    /// Returns true if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::NetworkError)
    }

    /// Returns true if this is a network error.
    pub fn is_network_error(&self) -> bool {
        matches!(self.kind, ErrorKind::NetworkError)
    }
}
