use crate::config::DiabetesConfig;
use crate::model::registry::ModelHandles;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};

/// Shared Application State
#[derive(Clone)]
pub struct AppState {
    pub models: ModelHandles,
    pub diabetes: DiabetesConfig,
    pub metrics: Option<PrometheusHandle>,
}

// --- DTOs (Data Transfer Objects) ---

/// Multipart field carrying the uploaded scan.
pub const IMAGE_FIELD: &str = "image";

/// Value of `result` when classification could not be completed.
pub const CLASSIFY_ERROR: &str = "Error";

#[derive(Serialize, Debug, PartialEq)]
pub struct ClassifyResponse {
    pub result: String,
}

impl ClassifyResponse {
    pub fn class(index: usize) -> Self {
        Self {
            result: index.to_string(),
        }
    }

    pub fn error() -> Self {
        Self {
            result: CLASSIFY_ERROR.to_string(),
        }
    }
}

// Kept as a raw value so shape problems get our own 400 message
#[derive(Deserialize)]
pub struct DiabetesRequest {
    #[serde(default)]
    pub features: serde_json::Value,
}
