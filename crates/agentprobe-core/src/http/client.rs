use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::AgentProbeError;
use crate::http::response::SendRequestOutput;

/// Per-attempt deadline for QA calls (agent answer and judge).
pub const QA_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-request deadline for load-test calls.
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Wrapper around a reqwest Client with builder-pattern configuration and
/// connection-pool settings.
///
/// Built once at process start and handed to whoever needs to talk to the
/// agent endpoint; cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: QA_TIMEOUT,
            pool_max_idle_per_host: 200,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("agentprobe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn build(self) -> Result<HttpClient, AgentProbeError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(HttpClient { inner: client })
    }
}

impl HttpClient {
    /// Create a new client with default settings.
    pub fn new() -> Result<Self, AgentProbeError> {
        HttpClientBuilder::default().build()
    }

    /// Returns a builder for customising the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// POST `body` as JSON to `url` and return the response with timing data.
    ///
    /// Any HTTP status is a successful return; only transport failures
    /// (connect, timeout, body read) produce an error.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &B,
        timeout: Duration,
    ) -> Result<SendRequestOutput, AgentProbeError> {
        let mut builder = self.inner.post(url).timeout(timeout).json(body);

        for (key, value) in headers {
            builder = builder.header(key, value);
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status().as_u16();

        let read_start = Instant::now();
        let body_bytes = response.bytes().await?;
        let read_ms = read_start.elapsed().as_millis() as u64;

        tracing::debug!(url, status, elapsed_ms, read_ms, "agent endpoint responded");

        Ok(SendRequestOutput {
            status,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
            elapsed_ms,
            read_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn default_client_builds_successfully() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn builder_chaining_all_options() {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent("agentprobe-test")
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn default_builder_has_expected_values() {
        let builder = HttpClientBuilder::default();
        assert_eq!(builder.timeout, QA_TIMEOUT);
        assert_eq!(builder.pool_max_idle_per_host, 200);
        assert_eq!(builder.pool_idle_timeout, Duration::from_secs(90));
        assert!(builder.user_agent.starts_with("agentprobe/"));
    }

    #[tokio::test]
    async fn post_json_sends_headers_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/run"))
            .and(header("x-api-key", "secret"))
            .and(body_json(serde_json::json!({ "q": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"text":"ok"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), "secret".to_string());

        let client = HttpClient::new().unwrap();
        let out = client
            .post_json(
                &format!("{}/run", mock_server.uri()),
                &headers,
                &serde_json::json!({ "q": 1 }),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(out.status, 200);
        assert_eq!(out.body, r#"{"text":"ok"}"#);
    }

    #[tokio::test]
    async fn post_json_returns_error_status_as_ok() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let out = client
            .post_json(
                &mock_server.uri(),
                &HashMap::new(),
                &serde_json::json!({}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(out.status, 503);
        assert!(!out.is_success());
    }

    #[tokio::test]
    async fn elapsed_covers_time_to_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("x".repeat(64 * 1024))
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new().unwrap();
        let out = client
            .post_json(
                &mock_server.uri(),
                &HashMap::new(),
                &serde_json::json!({}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert!(out.elapsed_ms >= 150);
        assert!(out.read_ms < out.elapsed_ms);
        assert_eq!(out.body.len(), 64 * 1024);
    }
}
