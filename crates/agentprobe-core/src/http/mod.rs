pub mod client;
pub mod request;
pub mod response;
pub mod retry;

pub use client::{HttpClient, HttpClientBuilder, QA_TIMEOUT, STRESS_TIMEOUT};
pub use request::{bearer_header, stress_headers, ChatPayload, SESSION_ID};
pub use response::SendRequestOutput;
pub use retry::{post_with_retries, retry_with_backoff, RetryPolicy};
