use crate::config::ModelsConfig;
use crate::error::InferenceError;
use crate::model::{loader, InferenceModel};
use crate::preprocessing::scaler::MinMaxScaler;
use std::sync::Arc;

pub type SharedModel = Arc<dyn InferenceModel>;

/// Every artifact the service reads at startup. Immutable once built and
/// shared by all handlers; an absent model stays absent until restart.
#[derive(Clone)]
pub struct ModelHandles {
    pub classifier: Option<SharedModel>,
    pub reconstructor: Option<SharedModel>,
    pub scaler: Arc<MinMaxScaler>,
}

impl ModelHandles {
    pub fn new(
        classifier: Option<SharedModel>,
        reconstructor: Option<SharedModel>,
        scaler: MinMaxScaler,
    ) -> Self {
        Self {
            classifier,
            reconstructor,
            scaler: Arc::new(scaler),
        }
    }

    /// Loads each artifact independently. A failure is logged and leaves that
    /// handle empty without affecting the others.
    pub fn load(config: &ModelsConfig) -> Self {
        let classifier = load_optional(
            "classification",
            &config.classifier_path,
            config.intra_threads,
        );
        let reconstructor = load_optional(
            "reconstruction",
            &config.autoencoder_path,
            config.intra_threads,
        );
        let scaler = MinMaxScaler::load_or_fallback(&config.scaler_path);

        Self::new(classifier, reconstructor, scaler)
    }

    pub fn classifier(&self) -> Result<&SharedModel, InferenceError> {
        self.classifier
            .as_ref()
            .ok_or(InferenceError::ModelUnavailable("Classification"))
    }

    pub fn reconstructor(&self) -> Result<&SharedModel, InferenceError> {
        self.reconstructor
            .as_ref()
            .ok_or(InferenceError::ModelUnavailable("Reconstruction"))
    }
}

fn load_optional(kind: &str, path: &str, intra_threads: usize) -> Option<SharedModel> {
    match loader::load_model(path, intra_threads) {
        Ok(model) => {
            tracing::info!(model = model.name(), "{} model ready", kind);
            Some(Arc::new(model))
        }
        Err(e) => {
            tracing::error!(path, error = %e, "error loading {} model", kind);
            None
        }
    }
}
