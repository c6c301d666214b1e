//! Redaction helpers for anything printed or written to disk

use serde_json::{Map, Value};

pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_KEYS: &[&str] = &[
    "authorization",
    "token",
    "user_token",
    "usertoken",
    "password",
    "ip",
    "ip_address",
    "client_ip",
    "api_key",
    "api_key_name",
    "key_name",
];

fn is_sensitive(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEYS.contains(&lowered.as_str())
}

/// Copy of `payload` with sensitive top-level values replaced by [`REDACTED`].
///
/// Key matching is case-insensitive; non-sensitive values are kept as-is.
pub fn redact_sensitive_fields(payload: &Map<String, Value>) -> Map<String, Value> {
    payload
        .iter()
        .map(|(key, value)| {
            let value = if is_sensitive(key) {
                Value::String(REDACTED.to_string())
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Short form of a key name: first two characters, an ellipsis and the last four.
///
/// Short names keep only their first character.
pub fn mask_key(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name == "—" {
        return "—".to_string();
    }
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= 6 {
        return match chars.first() {
            Some(first) => format!("{first}…"),
            None => "…".to_string(),
        };
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
