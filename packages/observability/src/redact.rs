//! Credential redaction for structured log fields.

use serde_json::Value;

const REDACTED: &str = "[REDACTED]";

/// Field names that never reach the log sink verbatim.
const DENYLIST_KEYS: &[&str] = &[
    "token",
    "password",
    "secret",
    "authorization",
    "refresh",
    "access",
];

/// True when a field name suggests it carries a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

/// Redact a field value by key, then by shape.
pub fn redact_value(key: &str, value: Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) if looks_like_credential(&s) => Value::String(REDACTED.to_string()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = redact_value(&k, v);
                    (k, v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| redact_value(key, item))
                .collect(),
        ),
        other => other,
    }
}

/// Bearer headers and anything shaped like a JWT (`xxx.yyy.zzz`).
fn looks_like_credential(raw: &str) -> bool {
    if raw.to_ascii_lowercase().starts_with("bearer ") {
        return true;
    }
    raw.len() > 40
        && raw.matches('.').count() == 2
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '='))
}
