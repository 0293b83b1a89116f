use std::time::{Duration, Instant};

use crate::config::AgentTarget;
use crate::engine::aggregator::QaAggregator;
use crate::engine::judge::{judge, Verdict};
use crate::error::AgentProbeError;
use crate::extractors::extract_text;
use crate::http::{post_with_retries, ChatPayload, HttpClient, RetryPolicy, SendRequestOutput, QA_TIMEOUT};
use crate::results::{QaReport, TestCase, TestResult, TestStatus};

/// Longest error message kept in an `ERROR` reason.
const MAX_ERROR_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Observation → CaseOutcome
// ---------------------------------------------------------------------------

/// What happened while a case was being processed, before any judgement.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    BlankQuestion,
    /// The call never produced a usable response (transport failure after
    /// retries, or a body that is not JSON).
    CallFailed { message: String },
    HttpError { status: u16 },
    /// The endpoint answered. `verdict` is `None` when no judgement was asked
    /// for.
    Answered {
        response: String,
        verdict: Option<Verdict>,
    },
}

/// Terminal state of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Pass { response: String, reason: String },
    Fail { response: String, reason: String },
    Error { reason: String },
    Skip,
    NotValidated { response: String },
}

impl Observation {
    /// Status code worth reporting: only an error status is kept.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Observation::HttpError { status } => Some(*status),
            _ => None,
        }
    }
}

/// Map an observation to its outcome. The single place where statuses are
/// decided.
pub fn classify(observation: Observation) -> CaseOutcome {
    match observation {
        Observation::BlankQuestion => CaseOutcome::Skip,
        Observation::CallFailed { message } => CaseOutcome::Error {
            reason: format!("Excepción: {}", truncate_chars(&message, MAX_ERROR_CHARS)),
        },
        Observation::HttpError { status } => CaseOutcome::Error {
            reason: format!("HTTP {status}"),
        },
        Observation::Answered { response, .. } if response.is_empty() => CaseOutcome::Error {
            reason: "Sin respuesta del agente".to_string(),
        },
        Observation::Answered {
            response,
            verdict: None,
        } => CaseOutcome::NotValidated { response },
        Observation::Answered {
            response,
            verdict: Some(Verdict { valid: true, reason }),
        } => CaseOutcome::Pass { response, reason },
        Observation::Answered {
            response,
            verdict: Some(Verdict { valid: false, reason }),
        } => CaseOutcome::Fail { response, reason },
    }
}

impl CaseOutcome {
    pub fn status(&self) -> TestStatus {
        match self {
            CaseOutcome::Pass { .. } => TestStatus::Pass,
            CaseOutcome::Fail { .. } => TestStatus::Fail,
            CaseOutcome::Error { .. } => TestStatus::Error,
            CaseOutcome::Skip => TestStatus::Skip,
            CaseOutcome::NotValidated { .. } => TestStatus::NotValidated,
        }
    }

    /// Split into `(response, reason)`.
    fn into_parts(self) -> (String, String) {
        match self {
            CaseOutcome::Pass { response, reason } | CaseOutcome::Fail { response, reason } => {
                (response, reason)
            }
            CaseOutcome::Error { reason } => (String::new(), reason),
            CaseOutcome::Skip => (String::new(), "Pregunta vacía".to_string()),
            CaseOutcome::NotValidated { response } => {
                (response, "Sin respuesta esperada para validar".to_string())
            }
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

impl TestResult {
    /// Assemble the record for case number `index` (1-based).
    pub fn from_outcome(
        index: usize,
        case: &TestCase,
        outcome: CaseOutcome,
        latency_ms: u64,
        http_status: Option<u16>,
    ) -> Self {
        let status = outcome.status();
        let (response, reason) = outcome.into_parts();
        TestResult {
            index,
            question: case.question.clone(),
            expected: case.expected.clone(),
            response,
            status,
            reason,
            latency_ms,
            http_status,
        }
    }
}

// ---------------------------------------------------------------------------
// QaRunner
// ---------------------------------------------------------------------------

/// Drives test cases through the agent endpoint one at a time.
///
/// Cases never overlap, and a case's judge call starts only after its answer
/// arrived. Latency covers the answer call alone.
pub struct QaRunner {
    client: HttpClient,
    target: AgentTarget,
    policy: RetryPolicy,
    timeout: Duration,
    skip_validation: bool,
}

impl QaRunner {
    pub fn new(client: HttpClient, target: AgentTarget) -> Self {
        Self {
            client,
            target,
            policy: RetryPolicy::default(),
            timeout: QA_TIMEOUT,
            skip_validation: false,
        }
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// Run every case in order and summarise the batch against `threshold`.
    pub async fn run(&self, cases: &[TestCase], threshold: f64) -> QaReport {
        tracing::info!(
            cases = cases.len(),
            skip_validation = self.skip_validation,
            "starting QA run against {}",
            self.target.url
        );

        let mut agg = QaAggregator::new();
        let mut results = Vec::with_capacity(cases.len());

        for (i, case) in cases.iter().enumerate() {
            let result = self.run_case(i + 1, case).await;
            agg.record(&result);
            tracing::debug!(
                index = result.index,
                status = %result.status,
                latency_ms = result.latency_ms,
                done = agg.total(),
                "case finished"
            );
            results.push(result);
        }

        let metrics = agg.metrics(threshold);
        tracing::info!(
            total = metrics.total,
            success = metrics.success,
            failed = metrics.failed,
            errors = metrics.errors,
            skipped = metrics.skipped,
            success_rate = metrics.success_rate,
            passed = metrics.passed,
            "QA run finished"
        );

        QaReport { results, metrics }
    }

    /// Process a single case. Never fails; every problem becomes an `ERROR`
    /// or `FAIL` result.
    pub async fn run_case(&self, index: usize, case: &TestCase) -> TestResult {
        if case.question.trim().is_empty() {
            return TestResult::from_outcome(index, case, classify(Observation::BlankQuestion), 0, None);
        }

        let started = Instant::now();
        let reply = self.ask(&case.question).await;
        let total_ms = started.elapsed().as_millis() as u64;

        // Latency stops when the final attempt's headers arrived.
        let latency_ms = match &reply {
            Ok(output) => total_ms.saturating_sub(output.read_ms),
            Err(_) => total_ms,
        };

        let observation = match reply {
            Err(err) => {
                tracing::warn!(index, "agent call failed: {err}");
                Observation::CallFailed { message: err.to_string() }
            }
            Ok(output) if output.status >= 400 => {
                tracing::warn!(index, status = output.status, "agent returned an error status");
                Observation::HttpError { status: output.status }
            }
            Ok(output) => self.observe_answer(case, &output).await,
        };

        let http_status = observation.http_status();
        TestResult::from_outcome(index, case, classify(observation), latency_ms, http_status)
    }

    async fn ask(&self, question: &str) -> Result<SendRequestOutput, AgentProbeError> {
        let payload = ChatPayload::new(question);
        post_with_retries(
            &self.client,
            &self.target.url,
            &self.target.headers,
            &payload,
            self.timeout,
            &self.policy,
        )
        .await
    }

    /// Extract the answer and, when there is something to compare against,
    /// have it judged.
    async fn observe_answer(&self, case: &TestCase, output: &SendRequestOutput) -> Observation {
        let body = match output.json() {
            Ok(body) => body,
            Err(err) => {
                return Observation::CallFailed {
                    message: err.to_string(),
                }
            }
        };

        let response = extract_text(&body);
        let wants_verdict =
            !response.is_empty() && !self.skip_validation && !case.expected.trim().is_empty();

        let verdict = if wants_verdict {
            Some(
                judge(
                    &self.client,
                    &self.target,
                    &self.policy,
                    self.timeout,
                    &case.expected,
                    &response,
                )
                .await,
            )
        } else {
            None
        };

        Observation::Answered {
            response,
            verdict,
        }
    }
}
