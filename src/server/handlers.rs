use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

use crate::diagnosis::{self, DiabetesAssessment};
use crate::error::InferenceError;
use crate::preprocessing::{self, features::parse_features};
use crate::server::types::*;

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn render_metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Classifies an uploaded scan. Upload problems are a 400; once the image is
/// accepted, any failure is reported as `{"result": "Error"}` with a 200.
pub async fn classify_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassifyResponse>, InferenceError> {
    counter!("requests_total", 1, "endpoint" => "classify");

    // 1. Read the upload
    let bytes = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(e) => return Err(reject_upload(e)),
    };

    // 2. Decode & infer off the async workers
    let start = Instant::now();
    let models = state.models.clone();
    let outcome = tokio::task::spawn_blocking(
        move || -> Result<Result<usize, InferenceError>, InferenceError> {
            let tensor = preprocessing::image::process_bytes(&bytes)?;
            Ok(models
                .classifier()
                .and_then(|model| diagnosis::classify(model.as_ref(), tensor)))
        },
    )
    .await
    .unwrap_or_else(|e| Ok(Err(InferenceError::from(e))));
    histogram!(
        "inference_duration_seconds",
        start.elapsed().as_secs_f64(),
        "endpoint" => "classify"
    );

    let result = match outcome {
        Ok(result) => result,
        Err(e) => return Err(reject_upload(e)),
    };

    // 3. Post-process
    match result {
        Ok(class) => {
            tracing::info!(class, "classified image");
            Ok(Json(ClassifyResponse::class(class)))
        }
        Err(e) => {
            counter!("request_errors_total", 1, "endpoint" => "classify");
            tracing::error!(error = %e, "error in classification");
            Ok(Json(ClassifyResponse::error()))
        }
    }
}

fn reject_upload(e: InferenceError) -> InferenceError {
    counter!("request_errors_total", 1, "endpoint" => "classify");
    tracing::warn!(error = %e, "rejected classification upload");
    InferenceError::InvalidUpload
}

async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Bytes, InferenceError> {
    let mut multipart = multipart.map_err(|_| InferenceError::InvalidUpload)?;
    image_field(&mut multipart).await
}

async fn image_field(multipart: &mut Multipart) -> Result<Bytes, InferenceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| InferenceError::InvalidUpload)?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|_| InferenceError::InvalidUpload)?;
        if data.is_empty() {
            return Err(InferenceError::InvalidUpload);
        }
        return Ok(data);
    }

    Err(InferenceError::InvalidUpload)
}

/// Screens a (fasting, post-prandial) blood sugar pair for diabetes risk.
pub async fn predict_diabetes(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DiabetesRequest>, JsonRejection>,
) -> Result<Json<DiabetesAssessment>, InferenceError> {
    counter!("requests_total", 1, "endpoint" => "predict_diabetes");

    let start = Instant::now();
    let result = assess(&state, payload).await;
    histogram!(
        "inference_duration_seconds",
        start.elapsed().as_secs_f64(),
        "endpoint" => "predict_diabetes"
    );

    match result {
        Ok(assessment) => {
            tracing::info!(
                verdict = ?assessment.possible_diabetes,
                error = assessment.reconstruction_error,
                "diabetes assessment"
            );
            Ok(Json(assessment))
        }
        Err(e) => {
            counter!("request_errors_total", 1, "endpoint" => "predict_diabetes");
            tracing::error!(error = %e, "error in diabetes prediction");
            Err(e)
        }
    }
}

async fn assess(
    state: &AppState,
    payload: Result<Json<DiabetesRequest>, JsonRejection>,
) -> Result<DiabetesAssessment, InferenceError> {
    let Json(payload) = payload.map_err(|e| InferenceError::InvalidFeatures(e.body_text()))?;
    let features = parse_features(&payload.features)?;

    let models = state.models.clone();
    let threshold = state.diabetes.threshold;
    tokio::task::spawn_blocking(move || diagnosis::assess_diabetes(&models, features, threshold))
        .await?
}
