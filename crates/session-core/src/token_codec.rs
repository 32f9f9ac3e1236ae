//! Bearer token decoding.
//!
//! Reads the payload segment of a JWT to learn who the session belongs to
//! and when the access token expires. Signatures are not checked; the
//! backend authorizes every request on its own, so decoded claims are used
//! for display and expiry decisions only.

use crate::{SessionError, SessionResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity and expiry read from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// `user_id` (SimpleJWT) or `sub`, normalized to a string.
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    exp: Option<Value>,
}

/// Decode the claims of a bearer token without verifying its signature.
pub fn decode(token: &str) -> SessionResult<IdentityClaims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(SessionError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(format!("payload is not base64url: {}", e)))?;

    let raw: RawClaims = serde_json::from_slice(&payload)
        .map_err(|e| SessionError::MalformedToken(format!("payload is not a JSON object: {}", e)))?;

    let subject = raw
        .user_id
        .as_ref()
        .or(raw.sub.as_ref())
        .and_then(subject_string)
        .ok_or_else(|| SessionError::MalformedToken("missing subject claim".to_string()))?;

    let expires_at = raw
        .exp
        .as_ref()
        .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64)))
        .ok_or_else(|| SessionError::MalformedToken("missing exp claim".to_string()))?;

    Ok(IdentityClaims {
        subject,
        display_name: raw.username.or(raw.name),
        email: raw.email,
        token_type: raw.token_type,
        expires_at,
    })
}

fn subject_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Current time as seconds since the Unix epoch.
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// True iff `now >= expires_at`. No clock-skew allowance.
pub fn is_expired(claims: &IdentityClaims, now: i64) -> bool {
    now >= claims.expires_at
}

/// Like [`is_expired`], treating the token as expired `leeway_secs` early.
pub fn is_expired_with_leeway(claims: &IdentityClaims, now: i64, leeway_secs: i64) -> bool {
    now.saturating_add(leeway_secs.max(0)) >= claims.expires_at
}

/// Remaining lifetime; negative once expired.
pub fn expires_in(claims: &IdentityClaims, now: i64) -> Duration {
    Duration::seconds(claims.expires_at.saturating_sub(now))
}
