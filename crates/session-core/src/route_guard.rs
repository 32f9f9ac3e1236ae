//! Route guarding for protected views.
//!
//! Advisory only: it keeps signed-out users away from screens they cannot
//! use, but the backend still authorizes every request.

use crate::session::SessionManager;
use crate::state::SessionState;
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Where unauthenticated users are sent.
pub const LOGIN_PATH: &str = "/login";

/// Views of the blog client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "id", rename_all = "snake_case")]
pub enum Route {
    Home,
    Login,
    Signup,
    Blogs,
    BlogDetail(u64),
    BlogCreate,
    BlogEdit(u64),
}

impl Route {
    /// Parse a path such as `/blogs/7/edit`. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path
            .split('?')
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["signup"] => Some(Route::Signup),
            ["blogs"] => Some(Route::Blogs),
            ["blogs", "create"] => Some(Route::BlogCreate),
            ["blogs", id] => id.parse().ok().map(Route::BlogDetail),
            ["blogs", id, "edit"] => id.parse().ok().map(Route::BlogEdit),
            _ => None,
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::BlogCreate | Route::BlogEdit(_))
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => LOGIN_PATH.to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Blogs => "/blogs".to_string(),
            Route::BlogDetail(id) => format!("/blogs/{}", id),
            Route::BlogCreate => "/blogs/create".to_string(),
            Route::BlogEdit(id) => format!("/blogs/{}/edit", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Startup re-authentication is still running; show a placeholder.
    Pending,
    Allow,
    Redirect { to: &'static str },
}

/// Decide access to `route` from a state snapshot.
pub fn decide(state: &SessionState, route: &Route) -> GuardDecision {
    if !route.requires_auth() {
        return GuardDecision::Allow;
    }
    if state.is_initializing {
        return GuardDecision::Pending;
    }
    if state.access_token.is_some() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect { to: LOGIN_PATH }
    }
}

/// Subscribes to session state and answers navigation checks.
#[derive(Clone)]
pub struct RouteGuard {
    state: watch::Receiver<SessionState>,
}

impl RouteGuard {
    pub fn new(session: &SessionManager) -> Self {
        Self {
            state: session.subscribe(),
        }
    }

    /// Decision for the current state; `Pending` while initializing.
    pub fn check(&self, route: &Route) -> GuardDecision {
        decide(&self.state.borrow(), route)
    }

    /// Wait for initialization to finish, then decide.
    pub async fn resolve(&self, route: &Route) -> GuardDecision {
        let mut state = self.state.clone();
        // Errors only if the session manager was dropped; the last
        // published state is still readable.
        let _ = state.wait_for(|s| !s.is_initializing).await;
        let current = state.borrow();
        decide(&current, route)
    }
}
