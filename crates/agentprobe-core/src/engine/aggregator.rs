use crate::results::{
    StressRequestResult, StressStats, StressStatus, TestMetrics, TestResult, TestStatus,
};

// ---------------------------------------------------------------------------
// Latency helpers
// ---------------------------------------------------------------------------

/// Nearest-rank percentile over an ascending-sorted slice: the value at index
/// `min(floor(n * q), n - 1)`. Returns 0 for an empty slice.
pub fn nearest_rank(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Rounded arithmetic mean; 0 for an empty input.
fn rounded_mean(sum: u64, count: usize) -> u64 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u64
}

// ---------------------------------------------------------------------------
// QaAggregator
// ---------------------------------------------------------------------------

/// Running counters for a QA run, fed one result at a time by the runner.
#[derive(Debug, Clone, Default)]
pub struct QaAggregator {
    total: usize,
    success: usize,
    failed: usize,
    errors: usize,
    skipped: usize,
    latency_sum_ms: u64,
    timed_cases: usize,
}

impl QaAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the classification of one finished case.
    pub fn record(&mut self, result: &TestResult) {
        self.total += 1;
        match result.status {
            TestStatus::Pass => self.success += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::Error => self.errors += 1,
            TestStatus::Skip => self.skipped += 1,
            TestStatus::NotValidated => {}
        }
        if result.latency_ms > 0 {
            self.latency_sum_ms += result.latency_ms;
            self.timed_cases += 1;
        }
    }

    /// Cases recorded so far.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Build the batch summary.
    ///
    /// `validated` only counts cases a judge ruled on, so a run made solely
    /// of errors, skips and unvalidated answers reports a 0 % rate and does
    /// not pass.
    pub fn metrics(&self, threshold: f64) -> TestMetrics {
        let validated = self.success + self.failed;
        let rate = if validated > 0 {
            self.success as f64 / validated as f64 * 100.0
        } else {
            0.0
        };

        TestMetrics {
            total: self.total,
            success: self.success,
            failed: self.failed,
            errors: self.errors,
            skipped: self.skipped,
            validated,
            success_rate: (rate * 10.0).round() / 10.0,
            threshold,
            passed: validated > 0 && rate >= threshold,
            avg_latency_ms: rounded_mean(self.latency_sum_ms, self.timed_cases),
        }
    }
}

impl TestMetrics {
    /// Summarise a complete result sequence.
    pub fn from_results(results: &[TestResult], threshold: f64) -> Self {
        let mut agg = QaAggregator::new();
        for result in results {
            agg.record(result);
        }
        agg.metrics(threshold)
    }
}

// ---------------------------------------------------------------------------
// Load-run statistics
// ---------------------------------------------------------------------------

impl StressStats {
    /// Summarise the results of a load run.
    pub fn from_results(results: &[StressRequestResult]) -> Self {
        let mut latencies: Vec<u64> = results.iter().map(|r| r.latency_ms).collect();
        latencies.sort_unstable();

        let success = results
            .iter()
            .filter(|r| r.status == StressStatus::Success)
            .count();

        StressStats {
            total: results.len(),
            success,
            errors: results.len() - success,
            avg_latency_ms: rounded_mean(latencies.iter().sum(), latencies.len()),
            min_latency_ms: latencies.first().copied().unwrap_or(0),
            max_latency_ms: latencies.last().copied().unwrap_or(0),
            p95_latency_ms: nearest_rank(&latencies, 0.95),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
