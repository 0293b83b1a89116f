pub mod aggregator;
pub mod judge;
pub mod qa;
pub mod stress;

pub use aggregator::{nearest_rank, QaAggregator};
pub use judge::{build_prompt, judge, parse_verdict, Verdict};
pub use qa::{classify, CaseOutcome, Observation, QaRunner};
pub use stress::{
    resolve_concurrency, run_stress, StressInput, StressPlan, DEFAULT_CONCURRENCY, DEFAULT_MESSAGE,
    MAX_CONCURRENCY,
};
