use serde::{Deserialize, Serialize};

use crate::error::AgentProbeError;

/// The result of executing a single HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SendRequestOutput {
    /// HTTP response status code (e.g. 200, 404).
    pub status: u16,

    /// Response body decoded as UTF-8 (replacement characters for invalid
    /// sequences).
    pub body: String,

    /// Milliseconds from just before `send()` until the response headers
    /// arrived.
    pub elapsed_ms: u64,

    /// Milliseconds spent reading the body after the headers.
    #[serde(default)]
    pub read_ms: u64,
}

impl SendRequestOutput {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, AgentProbeError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
