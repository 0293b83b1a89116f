use std::sync::Arc;
use std::time::Duration;

use agentprobe_core::config::AgentDefaults;
use agentprobe_core::http::HttpClient;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Request budget of a whole QA run.
pub const TESTING_BUDGET: Duration = Duration::from_secs(300);

/// Shared by every handler: one connection pool and the environment
/// defaults read at startup.
pub struct AppState {
    pub client: HttpClient,
    pub defaults: AgentDefaults,
}

impl AppState {
    pub fn new(client: HttpClient, defaults: AgentDefaults) -> Self {
        Self { client, defaults }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/stress", post(handlers::stress))
        .route(
            "/api/testing",
            post(handlers::testing).layer(TimeoutLayer::new(TESTING_BUDGET)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(defaults: AgentDefaults) -> Router {
        let client = HttpClient::new().unwrap();
        router(Arc::new(AppState::new(client, defaults)))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app(AgentDefaults::default())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn stress_without_url_is_bad_request() {
        let response = app(AgentDefaults::default())
            .oneshot(post_json("/api/stress", json!({ "webhookUrl": "  " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({ "error": "webhookUrl es requerido." })
        );
    }

    #[tokio::test]
    async fn stress_with_malformed_body_is_internal_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/stress")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app(AgentDefaults::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn stress_runs_against_webhook() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(4)
            .mount(&mock_server)
            .await;

        let response = app(AgentDefaults::default())
            .oneshot(post_json(
                "/api/stress",
                json!({ "webhookUrl": mock_server.uri(), "concurrency": "4" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 4);
        assert_eq!(body["stats"]["total"], 4);
        assert_eq!(body["stats"]["success"], 4);
        assert_eq!(body["results"][0]["status"], "success");
        assert_eq!(body["results"][0]["httpStatus"], 200);
    }

    #[tokio::test]
    async fn testing_without_target_is_bad_request() {
        let response = app(AgentDefaults::default())
            .oneshot(post_json("/api/testing", json!({ "testCases": [{ "question": "Q" }] })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"]
            .as_str()
            .unwrap()
            .starts_with("Falta API URL o API Key"));
    }

    #[tokio::test]
    async fn testing_with_malformed_body_is_internal_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/testing")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"testCases": 5}"#))
            .unwrap();

        let response = app(AgentDefaults::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(read_json(response).await["error"]
            .as_str()
            .unwrap()
            .starts_with("Error interno: "));
    }

    #[tokio::test]
    async fn testing_case_without_question_is_internal_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let defaults = AgentDefaults {
            langflow_api_url: Some(mock_server.uri()),
            langflow_api_key: Some("key".to_string()),
            ..AgentDefaults::default()
        };

        let response = app(defaults)
            .oneshot(post_json("/api/testing", json!({ "testCases": [{ "expected": "A" }] })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Error interno: "));
        assert!(body.get("results").is_none());
    }

    #[tokio::test]
    async fn testing_end_to_end_pass_with_env_defaults() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_string_contains("RESPUESTA ESPERADA"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "text": "{\"valida\":true,\"razon\":\"ok\"}" })),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "A1" })))
            .mount(&mock_server)
            .await;

        let defaults = AgentDefaults {
            langflow_api_url: Some(mock_server.uri()),
            langflow_api_key: Some("key".to_string()),
            ..AgentDefaults::default()
        };

        let response = app(defaults)
            .oneshot(post_json(
                "/api/testing",
                json!({ "testCases": [{ "question": "Q1", "expected": "A1" }, { "question": "  " }] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["results"][0]["status"], "PASS");
        assert_eq!(body["results"][0]["index"], 1);
        assert_eq!(body["results"][1]["status"], "SKIP");
        assert_eq!(body["results"][1]["index"], 2);
        assert_eq!(body["metrics"]["successRate"], 100.0);
        assert_eq!(body["metrics"]["skipped"], 1);
        assert_eq!(body["metrics"]["passed"], true);
    }
}
