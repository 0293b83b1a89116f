pub mod export;
pub mod import;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// QA run
// ---------------------------------------------------------------------------

/// A question to send to the agent, with the answer it should give.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub question: String,
    #[serde(default)]
    pub expected: String,
}

impl TestCase {
    pub fn new(question: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            expected: expected.into(),
        }
    }
}

/// Terminal classification of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "SKIP")]
    Skip,
    /// Answered, but there was nothing to compare against.
    #[serde(rename = "NO_VALIDADO")]
    NotValidated,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
            TestStatus::Skip => "SKIP",
            TestStatus::NotValidated => "NO_VALIDADO",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one test case as produced by the QA runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// 1-based position in the input.
    pub index: usize,
    pub question: String,
    pub expected: String,
    pub response: String,
    pub status: TestStatus,
    pub reason: String,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

/// Batch-level summary of a QA run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetrics {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    /// `success + failed`: the cases a judge actually ruled on.
    pub validated: usize,
    /// Percentage of validated cases that passed, rounded to one decimal.
    pub success_rate: f64,
    pub threshold: f64,
    pub passed: bool,
    pub avg_latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Load run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressStatus {
    Success,
    Error,
}

/// Outcome of one request in a load run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressRequestResult {
    /// 1-based request number.
    pub index: usize,
    pub status: StressStatus,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Transport error message, when the request never got a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Latency and outcome summary of a load run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStats {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub avg_latency_ms: u64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub p95_latency_ms: u64,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Everything a QA run returns to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaReport {
    pub results: Vec<TestResult>,
    pub metrics: TestMetrics,
}

/// Everything a load run returns to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub results: Vec<StressRequestResult>,
    pub stats: StressStats,
}
