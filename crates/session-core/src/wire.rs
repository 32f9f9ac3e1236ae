//! Backend request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Endpoint paths, relative to the API base URL.
pub mod endpoints {
    pub const LOGIN: &str = "login/";
    pub const SIGNUP: &str = "signup/";
    pub const TOKEN_REFRESH: &str = "token/refresh/";
    pub const LOGOUT: &str = "logout/";
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Deserialize)]
pub(crate) struct SignupResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
}

#[derive(Serialize)]
pub(crate) struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

/// Django REST Framework error body.
///
/// Either `{"detail": "..."}` or a map of field name to messages, e.g.
/// `{"email": ["user with this email already exists."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: Option<String>,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    /// Parse a response body. Non-JSON bodies become the detail verbatim.
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                return Self {
                    detail: (!trimmed.is_empty()).then(|| truncate(trimmed)),
                    fields: BTreeMap::new(),
                }
            }
        };

        let mut parsed = Self::default();
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    let messages = messages_of(&value);
                    if messages.is_empty() {
                        continue;
                    }
                    if matches!(key.as_str(), "detail" | "message" | "error") && parsed.detail.is_none() {
                        parsed.detail = Some(messages.join(" "));
                    } else {
                        parsed.fields.insert(key, messages);
                    }
                }
            }
            other => {
                let messages = messages_of(&other);
                if !messages.is_empty() {
                    parsed.detail = Some(messages.join(" "));
                }
            }
        }
        parsed
    }

    /// One line suitable for an error message.
    pub fn summary(&self) -> Option<String> {
        if let Some(detail) = &self.detail {
            return Some(detail.clone());
        }
        if self.fields.is_empty() {
            return None;
        }
        Some(
            self.fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages_of).collect(),
        Value::Object(map) => map.values().flat_map(messages_of).collect(),
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(_) | Value::Null => Vec::new(),
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
