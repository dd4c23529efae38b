use crate::models::exterior::IMAGE_FIELD;
use crate::models::{storage_key, ControlNetInput, ExteriorForm, UploadedImage};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use metrics::{counter, histogram};
use serde_json::Value;
use service_core::error::AppError;
use std::time::Instant;

/// `POST /upload-exterior`: store the photo, render it through the
/// image-to-image model and return the model output as-is.
pub async fn upload_exterior(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    let upload = read_form(multipart)
        .await
        .and_then(ExteriorForm::validate)
        .map_err(|e| {
            tracing::info!(error = %e, "Rejected exterior upload");
            counter!("exterior_uploads_total", "outcome" => "rejected").increment(1);
            e
        })?;

    let key = storage_key(chrono::Utc::now().timestamp_millis(), &upload.image.file_name);
    let size = upload.image.bytes.len();

    tracing::info!(
        key = %key,
        size = size,
        content_type = %upload.image.content_type,
        mode = upload.source.mode(),
        "Exterior upload started"
    );

    let image_url = state
        .storage
        .put(&key, upload.image.bytes, &upload.image.content_type)
        .await
        .map_err(|e| {
            counter!("exterior_uploads_total", "outcome" => "storage_failed").increment(1);
            e
        })?;

    counter!("exterior_uploads_total", "outcome" => "stored").increment(1);

    let input = ControlNetInput::new(image_url, upload.source.prompt());

    let start = Instant::now();
    let output = state.image_model.run(&input).await.map_err(|e| {
        // The stored object is not removed.
        tracing::warn!(key = %key, "Generation failed after upload");
        counter!("exterior_generations_total", "outcome" => "failed").increment(1);
        AppError::from(e)
    })?;
    histogram!("inference_duration_seconds", "provider" => "replicate")
        .record(start.elapsed().as_secs_f64());
    counter!("exterior_generations_total", "outcome" => "succeeded").increment(1);

    tracing::info!(key = %key, "Exterior generation completed");

    Ok(Json(output))
}

/// Drains the whole multipart body so validation sees every field regardless
/// of the order the client sent them in. A body that is not multipart at all
/// carries no file.
async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ExteriorForm, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Request body is not multipart");
        AppError::BadRequest(anyhow::anyhow!("No file uploaded"))
    })?;
    let mut form = ExteriorForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        // Only parts with a filename are files; a plain `image` text part is ignored.
        if name == IMAGE_FIELD && field.file_name().is_some() {
            if form.image.is_some() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only one image may be uploaded"
                )));
            }

            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
            })?;

            form.image = Some(UploadedImage {
                bytes: bytes.to_vec(),
                content_type,
                file_name,
            });
            continue;
        }

        let value = field.text().await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read field {}: {}", name, e))
        })?;
        if !form.set_text(&name, value) {
            tracing::debug!(field = %name, "Ignoring unknown multipart field");
        }
    }

    Ok(form)
}
