//! Semantic judge: asks the agent endpoint itself whether an answer is
//! equivalent to the expected one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AgentTarget;
use crate::extractors::{extract_text, json_value_to_string};
use crate::http::{post_with_retries, ChatPayload, HttpClient, RetryPolicy};

/// Words that count as a positive ruling when the judge's reply is not JSON.
const AFFIRMATIVE: [&str; 5] = ["true", "válida", "valida", "correcta", "equivalente"];

/// The judge's ruling on one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub valid: bool,
    pub reason: String,
}

impl Verdict {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }
}

/// Prompt sent to the judge model.
pub fn build_prompt(expected: &str, actual: &str) -> String {
    format!(
        "Sos un evaluador de respuestas de un agente de soporte. \n\
Compará la respuesta esperada con la respuesta del agente y determiná si son EQUIVALENTES en contenido y significado.\n\
No es necesario que sean idénticas, pero deben transmitir la misma información clave.\n\
\n\
RESPUESTA ESPERADA:\n\
{expected}\n\
\n\
RESPUESTA DEL AGENTE:\n\
{actual}\n\
\n\
Respondé ÚNICAMENTE con un JSON en este formato exacto (sin texto adicional):\n\
{{\"valida\": true/false, \"razon\": \"explicación breve\"}}"
    )
}

/// JSON truthiness: `false`, `null`, `0` and `""` are false, everything else
/// (including empty arrays and objects) is true.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Interpret the judge's answer text.
///
/// The span from the first `{` to the last `}` is parsed as JSON first; if
/// that fails the text is scanned for affirmative keywords.
pub fn parse_verdict(answer: &str) -> Verdict {
    if let (Some(start), Some(end)) = (answer.find('{'), answer.rfind('}')) {
        if end > start {
            if let Ok(parsed) = serde_json::from_str::<Value>(&answer[start..=end]) {
                let valid = parsed.get("valida").is_some_and(is_truthy);
                let reason = parsed
                    .get("razon")
                    .filter(|r| is_truthy(r))
                    .map(json_value_to_string)
                    .unwrap_or_else(|| "Sin razón".to_string());
                return Verdict { valid, reason };
            }
        }
    }

    let lower = answer.to_lowercase();
    if AFFIRMATIVE.iter().any(|word| lower.contains(word)) {
        Verdict {
            valid: true,
            reason: "Validación positiva detectada".to_string(),
        }
    } else {
        Verdict::invalid("Validación negativa o no determinada")
    }
}

/// Ask the endpoint at `target` to compare `expected` with `actual`.
///
/// Never fails: transport problems, error statuses and unreadable replies all
/// come back as an invalid verdict with the cause in `reason`.
pub async fn judge(
    client: &HttpClient,
    target: &AgentTarget,
    policy: &RetryPolicy,
    timeout: Duration,
    expected: &str,
    actual: &str,
) -> Verdict {
    if expected.trim().is_empty() || actual.trim().is_empty() {
        return Verdict::invalid("Respuesta vacía");
    }

    let payload = ChatPayload::new(build_prompt(expected, actual));
    let reply = post_with_retries(client, &target.url, &target.headers, &payload, timeout, policy).await;

    let output = match reply {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!("judge call failed: {err}");
            return Verdict::invalid(format!("Error: {}", err.kind()));
        }
    };

    if output.status >= 400 {
        return Verdict::invalid(format!("Error HTTP {}", output.status));
    }

    match output.json() {
        Ok(body) => parse_verdict(&extract_text(&body)),
        Err(err) => Verdict::invalid(format!("Error: {}", err.kind())),
    }
}
