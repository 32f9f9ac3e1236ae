//! Session error types.

use std::collections::BTreeMap;
use thiserror::Error;

/// Error type for session and gateway operations.
///
/// Clone so a single refresh failure can be handed to every caller that
/// awaited the same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Login rejected by the backend
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Signup or form input rejected by the backend
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    /// Token could not be decoded
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Refresh failed or a renewed request was still rejected
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Operation not allowed in the current session phase
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Credential storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Returns true if retrying the same action later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Network(_) => true,
            SessionError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the user has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, SessionError::SessionExpired)
    }
}

impl From<token_storage::StorageError> for SessionError {
    fn from(err: token_storage::StorageError) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<quill_config_and_utils::CoreError> for SessionError {
    fn from(err: quill_config_and_utils::CoreError) -> Self {
        SessionError::Config(err.to_string())
    }
}

impl From<url::ParseError> for SessionError {
    fn from(err: url::ParseError) -> Self {
        SessionError::Config(format!("Invalid URL: {}", err))
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
