//! Error types for blog operations.

use session_core::SessionError;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlogError {
    /// Transport or session failure, passed through from the gateway.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Blog not found")]
    NotFound,

    /// The signed-in user may not modify this blog.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The backend rejected the title or content.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Backend error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl BlogError {
    /// Whether the user has to sign in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, BlogError::Session(e) if e.requires_login())
    }
}

pub type BlogResult<T> = Result<T, BlogError>;
