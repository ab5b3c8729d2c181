use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndarray::ShapeError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model not found at path: {0}")]
    ModelNotFound(String),

    #[error("{0} model failed to load")]
    ModelUnavailable(&'static str),

    #[error("ONNX Runtime error: {0}")]
    OrtError(#[from] ort::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid data")]
    InvalidUpload,

    #[error("{0}")]
    InvalidFeatures(String),

    #[error("Input shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Scaler error: {0}")]
    ScalerError(String),

    #[error("Unexpected model output: {0}")]
    UnexpectedOutput(String),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ShapeError),

    #[error("Inference task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl InferenceError {
    pub fn status(&self) -> StatusCode {
        match self {
            InferenceError::InvalidUpload
            | InferenceError::InvalidFeatures(_)
            | InferenceError::ImageError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            InferenceError::ImageError(_) => "Invalid data".to_string(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
