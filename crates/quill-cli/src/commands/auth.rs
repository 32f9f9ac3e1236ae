//! Authentication commands.

use super::{prompt, session_failure, App};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use serde::Serialize;
use session_core::token_codec::{self, IdentityClaims};
use session_core::{SessionError, SessionStatus};
use std::fmt;

fn display_name(identity: &IdentityClaims) -> &str {
    identity
        .display_name
        .as_deref()
        .or(identity.email.as_deref())
        .unwrap_or(&identity.subject)
}

/// Login with email and password.
pub async fn login(app: &App, format: &OutputFormat) -> Result<()> {
    if let Some(identity) = app.session.identity() {
        output::print_success(
            &format!("Already logged in as {}", display_name(&identity)),
            format,
        );
        return Ok(());
    }

    let email = prompt("Email")?;
    if email.is_empty() {
        bail!("Email is required");
    }

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    match app.session.login(&email, &password).await {
        Ok(identity) => {
            output::print_success(&format!("Logged in as {}", display_name(&identity)), format);
            Ok(())
        }
        Err(SessionError::InvalidCredentials(message)) => bail!("Login failed: {}", message),
        Err(e) => bail!("Login failed: {}", e),
    }
}

/// Create an account and sign in.
pub async fn signup(app: &App, format: &OutputFormat) -> Result<()> {
    if let Some(identity) = app.session.identity() {
        output::print_success(
            &format!("Already logged in as {}, log out first", display_name(&identity)),
            format,
        );
        return Ok(());
    }

    let username = prompt("Username")?;
    let email = prompt("Email")?;
    if username.is_empty() || email.is_empty() {
        bail!("Username and email are required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    match app.session.signup(&username, &email, &password).await {
        Ok(outcome) => {
            let message = outcome
                .message
                .unwrap_or_else(|| "Account created".to_string());
            output::print_success(
                &format!("{}. Logged in as {}", message, display_name(&outcome.identity)),
                format,
            );
            Ok(())
        }
        Err(SessionError::Validation { message, fields }) => {
            if matches!(format, OutputFormat::Text) {
                for (field, messages) in &fields {
                    eprintln!("  {}: {}", field, messages.join(" "));
                }
            }
            bail!("Signup failed: {}", message)
        }
        Err(e) => bail!("Signup failed: {}", e),
    }
}

/// Logout and clear session.
pub async fn logout(app: &App, format: &OutputFormat) -> Result<()> {
    if app.session.snapshot().access_token.is_none() {
        output::print_success("Not logged in", format);
        return Ok(());
    }

    app.session.logout().await.map_err(session_failure)?;
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Session summary for `quill status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<i64>,
}

impl StatusReport {
    pub fn new(status: SessionStatus, identity: Option<&IdentityClaims>, now: i64) -> Self {
        Self {
            status,
            user_id: identity.map(|i| i.subject.clone()),
            username: identity.and_then(|i| i.display_name.clone()),
            email: identity.and_then(|i| i.email.clone()),
            expires_at: identity.and_then(|i| {
                chrono::DateTime::from_timestamp(i.expires_at, 0).map(|t| t.to_rfc3339())
            }),
            expires_in_secs: identity.map(|i| token_codec::expires_in(i, now).num_seconds()),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            SessionStatus::Authenticated => writeln!(f, "Auth:     logged in")?,
            SessionStatus::Unauthenticated => return write!(f, "Auth:     not logged in"),
            SessionStatus::Initializing => return write!(f, "Auth:     unknown"),
        }
        writeln!(f, "User ID:  {}", self.user_id.as_deref().unwrap_or("unknown"))?;
        if let Some(username) = &self.username {
            writeln!(f, "Username: {}", username)?;
        }
        if let Some(email) = &self.email {
            writeln!(f, "Email:    {}", email)?;
        }
        write!(f, "Expires:  {}", self.expires_at.as_deref().unwrap_or("unknown"))?;
        match self.expires_in_secs {
            Some(secs) if secs > 0 => write!(f, " (in {}m {}s)", secs / 60, secs % 60)?,
            Some(_) => write!(f, " (expired)")?,
            None => {}
        }
        Ok(())
    }
}

/// Check authentication status.
pub async fn status(app: &App, format: &OutputFormat) -> Result<()> {
    let snapshot = app.session.snapshot();
    let report = StatusReport::new(
        snapshot.status(),
        snapshot.identity.as_ref(),
        token_codec::now_epoch(),
    );
    output::print(&report, format);
    Ok(())
}
