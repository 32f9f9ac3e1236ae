//! CLI command implementations.

mod auth;
mod blogs;

pub use auth::{login, logout, signup, status};
pub use blogs::{blogs_create, blogs_delete, blogs_edit, blogs_list, blogs_show};

use anyhow::{Context, Result};
use blog_api::{BlogClient, BlogError};
use quill_config_and_utils::{Config, Paths};
use session_core::{
    GuardDecision, HttpGateway, ReqwestTransport, Route, RouteGuard, SessionError, SessionManager,
};
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Printed instead of an error when a command needs a signed-in user.
pub const LOGIN_HINT: &str = "Login required, run `quill login`";

/// The command needs a session and there is none.
#[derive(Debug, Error)]
#[error("{}", LOGIN_HINT)]
pub struct LoginRequired;

/// Everything a command needs, wired from config.
pub struct App {
    pub session: SessionManager,
    pub blogs: BlogClient,
}

impl App {
    /// Build the session core and restore any stored session.
    pub async fn start(paths: &Paths, config: &Config) -> Result<Self> {
        let transport =
            ReqwestTransport::from_config(config).context("Failed to set up HTTP client")?;
        let store = token_storage::create_token_store(paths);
        let session = SessionManager::with_expiry_leeway(
            Arc::new(transport),
            store,
            config.expiry_leeway_secs,
        );

        let status = session.bootstrap().await;
        debug!(?status, "Session restored");

        let blogs = BlogClient::new(HttpGateway::new(session.clone()));
        Ok(Self { session, blogs })
    }

    /// Wait for the guard's verdict on `route`.
    pub async fn guard(&self, route: Route) -> Result<()> {
        match RouteGuard::new(&self.session).resolve(&route).await {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Redirect { to } => {
                debug!(route = %route, redirect = to, "Route requires login");
                Err(LoginRequired.into())
            }
            GuardDecision::Pending => Err(LoginRequired.into()),
        }
    }
}

/// Turn an expired session into the login hint; keep everything else.
pub(crate) fn session_failure(err: SessionError) -> anyhow::Error {
    if err.requires_login() {
        LoginRequired.into()
    } else {
        err.into()
    }
}

pub(crate) fn blog_failure(err: BlogError) -> anyhow::Error {
    if err.requires_login() {
        LoginRequired.into()
    } else {
        err.into()
    }
}

/// Read one trimmed line after printing `label`.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Ask user for confirmation.
pub(crate) fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    io::stdout().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
