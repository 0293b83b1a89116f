use std::sync::Arc;

use agentprobe_core::engine::{run_stress, QaRunner, StressInput};
use agentprobe_core::results::{QaReport, StressReport};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::protocol::{ApiError, TestingRequest};
use crate::server::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /api/stress`
pub async fn stress(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StressInput>, JsonRejection>,
) -> Result<Json<StressReport>, ApiError> {
    let Json(input) = body.map_err(|e| ApiError::Internal(e.body_text()))?;
    let plan = input.into_plan()?;

    Ok(Json(run_stress(&state.client, &plan).await))
}

/// `POST /api/testing`
pub async fn testing(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TestingRequest>, JsonRejection>,
) -> Result<Json<QaReport>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Internal(format!("Error interno: {}", e.body_text())))?;

    let config = request.config.unwrap_or_default();
    let resolved = config.resolve(&state.defaults)?;

    let runner = QaRunner::new(state.client.clone(), resolved.target)
        .skip_validation(resolved.skip_validation);

    Ok(Json(runner.run(&request.test_cases, resolved.threshold).await))
}
