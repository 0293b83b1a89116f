//! Bounded retry with exponential backoff for calls to the agent endpoint.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;

use crate::error::AgentProbeError;
use crate::http::client::HttpClient;
use crate::http::response::SendRequestOutput;

/// How many extra attempts a transport failure earns, and how long to wait
/// between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `2` means at most 3 attempts.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// No retries at all; used by the load runner.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay after the failed 0-based `attempt`: `min(2^attempt * base, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-transport error, or the
/// policy's retries are spent. The closure receives the 0-based attempt
/// number.
///
/// The last error is returned once retries are exhausted; there is no wait
/// after the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, AgentProbeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AgentProbeError>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transport() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "transport failure, retrying: {err}"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// POST `body` to `url`, retrying transport failures per `policy`.
///
/// HTTP error statuses are valid responses and come back on the first try.
pub async fn post_with_retries<B: Serialize + ?Sized>(
    client: &HttpClient,
    url: &str,
    headers: &HashMap<String, String>,
    body: &B,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<SendRequestOutput, AgentProbeError> {
    retry_with_backoff(policy, move |_| client.post_json(url, headers, body, timeout)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn transport_error() -> AgentProbeError {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused").into()
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn succeeds_after_two_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_policy(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(transport_error())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn always_failing_stops_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&fast_policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transport_error()) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AgentProbeError::Io(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transport_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&fast_policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AgentProbeError::Validation("bad input".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_policy_makes_a_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&RetryPolicy::none(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transport_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn http_error_status_is_returned_without_retry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let out = post_with_retries(
            &client,
            &mock_server.uri(),
            &HashMap::new(),
            &serde_json::json!({}),
            Duration::from_secs(5),
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(out.status, 500);
    }

    #[tokio::test]
    async fn unreachable_endpoint_propagates_transport_error() {
        // Bind then drop to get a local port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = HttpClient::new().unwrap();
        let err = post_with_retries(
            &client,
            &format!("http://127.0.0.1:{port}/"),
            &HashMap::new(),
            &serde_json::json!({}),
            Duration::from_secs(5),
            &fast_policy(),
        )
        .await
        .unwrap_err();

        assert!(err.is_transport());
    }
}
