use crate::{
    errors::ApiError,
    response::{HealthResponse, ImageShape, PredictionResponse, ServiceInfo},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use inference::InferenceError;
use std::sync::Arc;
use std::time::Instant;

/// Multipart form field carrying the image
pub const UPLOAD_FIELD: &str = "file";

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: state.host.status().as_str().to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if !state.host.is_ready() {
        return Err(ApiError::ServiceUnavailable);
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start = Instant::now();
    let result = run_prediction(&state, multipart).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(err) => err.status_code(),
    };
    state.metrics.record_request(status.as_u16(), start.elapsed());

    result.map(Json)
}

async fn run_prediction(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictionResponse, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        ApiError::InvalidInput(format!(
            "Expected a multipart/form-data upload: {}",
            rejection.body_text()
        ))
    })?;

    let upload = read_upload(multipart).await?;
    tracing::debug!(
        filename = upload.filename.as_deref().unwrap_or("<none>"),
        content_type = upload.content_type.as_deref().unwrap_or("<none>"),
        bytes = upload.bytes.len(),
        "Received upload"
    );

    let detector = state.host.detector()?;
    let worker = Arc::clone(&detector);

    let (shape, output) = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&upload.bytes)?.to_rgb8();
        let shape = ImageShape {
            width: image.width(),
            height: image.height(),
        };
        let output = worker.detect(&image).map_err(InferenceError::Inference)?;
        Ok::<_, ApiError>((shape, output))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("inference task failed: {e}")))??;

    state.metrics.record_detections(output.detections.len());
    tracing::info!(
        width = shape.width,
        height = shape.height,
        detections = output.detections.len(),
        inference_ms = output.speed.inference_ms,
        "Prediction served"
    );

    Ok(PredictionResponse::from_output(
        &output,
        shape,
        detector.class_names(),
    ))
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            break;
        }

        return Ok(Upload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(ApiError::InvalidInput("No file uploaded".to_string()))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidInput(err.body_text())
    }
}
