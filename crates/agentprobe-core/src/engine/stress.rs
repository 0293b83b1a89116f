use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::error::AgentProbeError;
use crate::http::{stress_headers, ChatPayload, HttpClient, STRESS_TIMEOUT};
use crate::results::{StressReport, StressRequestResult, StressStats, StressStatus};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const MAX_CONCURRENCY: usize = 200;
pub const DEFAULT_MESSAGE: &str = "stress test";

const MISSING_URL: &str = "webhookUrl es requerido.";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Raw load-run parameters as a caller supplies them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressInput {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Number or numeric string; anything else falls back to the default.
    #[serde(default)]
    pub concurrency: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A validated load run, ready to fire.
#[derive(Debug, Clone)]
pub struct StressPlan {
    pub webhook_url: String,
    pub headers: HashMap<String, String>,
    pub concurrency: usize,
    pub message: String,
    pub timeout: Duration,
}

impl StressInput {
    pub fn into_plan(self) -> Result<StressPlan, AgentProbeError> {
        let webhook_url = self
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AgentProbeError::Validation(MISSING_URL.to_string()))?
            .to_string();

        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string();

        Ok(StressPlan {
            webhook_url,
            headers: stress_headers(self.api_key.as_deref()),
            concurrency: resolve_concurrency(self.concurrency.as_ref()),
            message,
            timeout: STRESS_TIMEOUT,
        })
    }
}

/// Coerce a loosely typed concurrency value into `[1, MAX_CONCURRENCY]`.
///
/// The value is read the way JavaScript's `Number()` reads it; a result of
/// zero or NaN means the default. Fractions truncate after clamping.
pub fn resolve_concurrency(raw: Option<&Value>) -> usize {
    let n = raw.map_or(f64::NAN, js_number);
    if n.is_nan() || n == 0.0 {
        return DEFAULT_CONCURRENCY;
    }
    n.clamp(1.0, MAX_CONCURRENCY as f64) as usize
}

/// Numeric value of a JSON value under JavaScript `Number()` rules.
fn js_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => js_string_number(s),
        // An array converts through its joined string form.
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [Value::Null] => 0.0,
            [Value::Bool(_)] | [Value::Object(_)] => f64::NAN,
            [single] => js_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn js_string_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix).map_or(f64::NAN, |v| v as f64);
    }

    // Rust also accepts "inf", "nan" and friends; JavaScript does not.
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Fire `plan.concurrency` identical requests at once and wait for all of
/// them. Requests are not retried and one failure never cancels the rest.
pub async fn run_stress(client: &HttpClient, plan: &StressPlan) -> StressReport {
    tracing::info!(
        concurrency = plan.concurrency,
        "starting load run against {}",
        plan.webhook_url
    );

    let payload = ChatPayload::new(plan.message.clone());
    let mut join_set: JoinSet<StressRequestResult> = JoinSet::new();

    for index in 1..=plan.concurrency {
        let client = client.clone();
        let url = plan.webhook_url.clone();
        let headers = plan.headers.clone();
        let payload = payload.clone();
        let timeout = plan.timeout;

        join_set.spawn(async move { fire(&client, index, &url, &headers, &payload, timeout).await });
    }

    let mut results = Vec::with_capacity(plan.concurrency);
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!("load request task failed: {e}"),
        }
    }

    fill_missing(&mut results, plan.concurrency);

    let stats = StressStats::from_results(&results);
    tracing::info!(
        total = stats.total,
        success = stats.success,
        errors = stats.errors,
        avg_latency_ms = stats.avg_latency_ms,
        p95_latency_ms = stats.p95_latency_ms,
        "load run finished"
    );

    StressReport { results, stats }
}

async fn fire(
    client: &HttpClient,
    index: usize,
    url: &str,
    headers: &HashMap<String, String>,
    payload: &ChatPayload,
    timeout: Duration,
) -> StressRequestResult {
    let started = Instant::now();
    let reply = client.post_json(url, headers, payload, timeout).await;

    match reply {
        Ok(output) => StressRequestResult {
            index,
            status: if output.is_success() {
                StressStatus::Success
            } else {
                StressStatus::Error
            },
            latency_ms: output.elapsed_ms,
            http_status: Some(output.status),
            error: None,
        },
        Err(err) => {
            let latency_ms = started.elapsed().as_millis() as u64;
            tracing::debug!(index, "load request failed: {err}");
            StressRequestResult {
                index,
                status: StressStatus::Error,
                latency_ms,
                http_status: None,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Sort by index and add an error entry for every request whose task died.
fn fill_missing(results: &mut Vec<StressRequestResult>, expected: usize) {
    results.sort_unstable_by_key(|r| r.index);
    if results.len() == expected {
        return;
    }

    let present: Vec<usize> = results.iter().map(|r| r.index).collect();
    for index in 1..=expected {
        if present.binary_search(&index).is_err() {
            results.push(StressRequestResult {
                index,
                status: StressStatus::Error,
                latency_ms: 0,
                http_status: None,
                error: Some("request task aborted".to_string()),
            });
        }
    }
    results.sort_unstable_by_key(|r| r.index);
}
