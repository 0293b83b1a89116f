//! Agent endpoint configuration: environment defaults plus per-run overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AgentProbeError;
use crate::http::request::bearer_header;

pub const DEFAULT_ORIGIN: &str = "https://api.journeybuilder.numia.co";
pub const DEFAULT_REFERER: &str = "https://journeybuilder.desa.numia.co/";
pub const DEFAULT_THRESHOLD: f64 = 90.0;

const MISSING_TARGET: &str =
    "Falta API URL o API Key. Configurá las variables de entorno o ingresalas manualmente.";

// ---------------------------------------------------------------------------
// AgentDefaults
// ---------------------------------------------------------------------------

/// Process-wide defaults read from the environment once at startup.
///
/// Variable names map one-to-one onto the fields: `LANGFLOW_API_URL`,
/// `LANGFLOW_API_KEY`, `BEARER_TOKEN`, `AGENT_ORIGIN`, `AGENT_REFERER`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentDefaults {
    #[serde(default)]
    pub langflow_api_url: Option<String>,
    #[serde(default)]
    pub langflow_api_key: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_origin")]
    pub agent_origin: String,
    #[serde(default = "default_referer")]
    pub agent_referer: String,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_referer() -> String {
    DEFAULT_REFERER.to_string()
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            langflow_api_url: None,
            langflow_api_key: None,
            bearer_token: None,
            agent_origin: default_origin(),
            agent_referer: default_referer(),
        }
    }
}

impl AgentDefaults {
    pub fn from_env() -> Result<Self, AgentProbeError> {
        envy::from_env().map_err(|e| AgentProbeError::Config(e.to_string()))
    }

    /// Same as [`AgentDefaults::from_env`] over an explicit variable list.
    pub fn from_vars<I>(vars: I) -> Result<Self, AgentProbeError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).map_err(|e| AgentProbeError::Config(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TestConfig
// ---------------------------------------------------------------------------

/// Per-run overrides supplied by the caller of a QA run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Minimum success rate (0–100) for the batch to pass.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub skip_validation: Option<bool>,
}

/// A QA run's settings after overrides and defaults are merged.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub target: AgentTarget,
    pub threshold: f64,
    pub skip_validation: bool,
}

/// First non-empty value among an override and a default.
fn pick(over: Option<&str>, default: Option<&str>) -> String {
    over.filter(|v| !v.is_empty())
        .or(default.filter(|v| !v.is_empty()))
        .unwrap_or_default()
        .to_string()
}

impl TestConfig {
    /// Merge with `defaults`. An empty override falls back to the default;
    /// a missing URL or API key is a validation error.
    pub fn resolve(&self, defaults: &AgentDefaults) -> Result<ResolvedConfig, AgentProbeError> {
        let url = pick(self.api_url.as_deref(), defaults.langflow_api_url.as_deref());
        let api_key = pick(self.api_key.as_deref(), defaults.langflow_api_key.as_deref());
        let bearer = pick(self.bearer_token.as_deref(), defaults.bearer_token.as_deref());

        if url.is_empty() || api_key.is_empty() {
            return Err(AgentProbeError::Validation(MISSING_TARGET.to_string()));
        }

        Ok(ResolvedConfig {
            target: AgentTarget::new(url, &api_key, &bearer, defaults),
            threshold: self.threshold.unwrap_or(DEFAULT_THRESHOLD),
            skip_validation: self.skip_validation.unwrap_or(false),
        })
    }
}

// ---------------------------------------------------------------------------
// AgentTarget
// ---------------------------------------------------------------------------

/// Endpoint URL plus the full header set every QA call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTarget {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl AgentTarget {
    pub fn new(url: impl Into<String>, api_key: &str, bearer: &str, defaults: &AgentDefaults) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Origin".to_string(), defaults.agent_origin.clone());
        headers.insert("Referer".to_string(), defaults.agent_referer.clone());
        headers.insert("x-api-key".to_string(), api_key.to_string());
        if let Some(auth) = bearer_header(bearer) {
            headers.insert("Authorization".to_string(), auth);
        }

        Self {
            url: url.into(),
            headers,
        }
    }
}
