//! Observable session state.

use crate::token_codec::IdentityClaims;
use serde::Serialize;
use std::fmt;

/// Coarse view of the session used by route guarding and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup re-authentication has not finished; render nothing protected.
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Snapshot published by the session manager on every change.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Claims decoded from the current access token.
    pub identity: Option<IdentityClaims>,
    pub access_token: Option<String>,
    pub is_initializing: bool,
}

impl SessionState {
    /// State at process start, before bootstrap runs.
    pub fn initializing() -> Self {
        Self {
            identity: None,
            access_token: None,
            is_initializing: true,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_initializing {
            SessionStatus::Initializing
        } else if self.access_token.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initializing()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("identity", &self.identity)
            .field("has_access_token", &self.access_token.is_some())
            .field("is_initializing", &self.is_initializing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> IdentityClaims {
        IdentityClaims {
            subject: "42".to_string(),
            display_name: None,
            email: None,
            token_type: None,
            expires_at: 0,
        }
    }

    #[test]
    fn status_follows_initializing_then_token() {
        let mut state = SessionState::initializing();
        assert_eq!(state.status(), SessionStatus::Initializing);

        // A token found during startup does not count until bootstrap finishes.
        state.access_token = Some("A1".to_string());
        assert_eq!(state.status(), SessionStatus::Initializing);

        state.is_initializing = false;
        assert_eq!(state.status(), SessionStatus::Authenticated);

        state.access_token = None;
        assert_eq!(state.status(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn debug_hides_access_token() {
        let state = SessionState {
            identity: Some(identity()),
            access_token: Some("very-secret".to_string()),
            is_initializing: false,
        };
        let rendered = format!("{:?}", state);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("has_access_token: true"));
    }
}
