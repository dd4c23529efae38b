use crate::models::PlanRequest;
use crate::startup::AppState;
use axum::{extract::State, Json};
use metrics::{counter, histogram};
use serde_json::Value;
use service_core::error::AppError;
use std::time::Instant;

/// `POST /get-plan`: forward the prompt to the floor-plan model.
///
/// The body is not validated; an absent or unreadable body is treated as an
/// empty prompt.
pub async fn get_plan(
    State(state): State<AppState>,
    body: Option<Json<PlanRequest>>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = body.unwrap_or_default();

    if request.prompt.trim().is_empty() {
        tracing::warn!("Floor plan requested without a prompt");
    }

    let start = Instant::now();
    let result = state
        .floor_plan
        .predict(&request.prompt)
        .await
        .map_err(|e| {
            counter!("floor_plan_predictions_total", "outcome" => "failed").increment(1);
            AppError::from(e)
        })?;

    histogram!("inference_duration_seconds", "provider" => "gradio")
        .record(start.elapsed().as_secs_f64());
    counter!("floor_plan_predictions_total", "outcome" => "succeeded").increment(1);

    Ok(Json(result))
}
