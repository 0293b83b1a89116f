use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AgentProbeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentProbeError {
    /// Short, stable name of the failure class.
    ///
    /// Used where only the kind of failure should surface, e.g. in the reason
    /// attached to a judge call that blew up.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentProbeError::Http(e) if e.is_timeout() => "TimeoutError",
            AgentProbeError::Http(e) if e.is_connect() => "ConnectError",
            AgentProbeError::Http(e) if e.is_decode() || e.is_body() => "BodyError",
            AgentProbeError::Http(_) => "HttpError",
            AgentProbeError::Io(_) => "IoError",
            AgentProbeError::Serde(_) => "SyntaxError",
            AgentProbeError::Csv(_) => "CsvError",
            AgentProbeError::Validation(_) => "ValidationError",
            AgentProbeError::Config(_) => "ConfigError",
        }
    }

    /// `true` for failures that happened below HTTP semantics (connect,
    /// timeout, body read) and are worth another attempt.
    pub fn is_transport(&self) -> bool {
        matches!(self, AgentProbeError::Http(_) | AgentProbeError::Io(_))
    }
}

impl Serialize for AgentProbeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
