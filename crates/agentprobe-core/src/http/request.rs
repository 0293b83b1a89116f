use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session identifier the agent endpoint groups test traffic under.
pub const SESSION_ID: &str = "Testing RAG";

/// Body posted to the chat/agent webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatPayload {
    pub input_value: String,
    pub output_type: String,
    pub input_type: String,
    pub session_id: String,
}

impl ChatPayload {
    pub fn new(input_value: impl Into<String>) -> Self {
        Self {
            input_value: input_value.into(),
            output_type: "chat".to_string(),
            input_type: "chat".to_string(),
            session_id: SESSION_ID.to_string(),
        }
    }
}

/// Normalise a bearer credential into an `Authorization` header value.
///
/// Returns `None` for a blank token. A token that already carries the
/// `Bearer ` scheme (any case) is kept verbatim.
pub fn bearer_header(token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }
    if token.to_lowercase().starts_with("bearer ") {
        Some(token.to_string())
    } else {
        Some(format!("Bearer {token}"))
    }
}

/// Header set for a load-test request: JSON content type plus an optional
/// `x-api-key` (trimmed, skipped when blank).
pub fn stress_headers(api_key: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        headers.insert("x-api-key".to_string(), key.to_string());
    }
    headers
}
