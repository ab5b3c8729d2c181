use crate::error::InferenceError;
use crate::model::InferenceModel;
use ndarray::{ArrayD, ArrayViewD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

// Names the global ORT environment (only needed once, before any session).
// A failure is logged; building a session afterwards reports it again.
pub fn init_ort() {
    match ort::init().with_name("medivisual").commit() {
        Ok(_) => tracing::debug!("ORT environment ready"),
        Err(e) => tracing::warn!(error = %e, "failed to initialize ORT environment"),
    }
}

/// An ONNX Runtime session behind a mutex; `Session::run` needs exclusive access.
pub struct OnnxModel {
    name: String,
    session: Mutex<Session>,
}

impl OnnxModel {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl InferenceModel for OnnxModel {
    fn run(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>, InferenceError> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| InferenceError::UnexpectedOutput("model declares no inputs".into()))?;

        let shape = input.shape().to_vec();
        let data: Box<[f32]> = input.iter().copied().collect();
        let input_value = Tensor::from_array((shape, data))?;
        let outputs = session.run(ort::inputs![input_name => input_value])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        let output = ArrayViewD::from_shape(dims.as_slice(), data)?.to_owned();

        Ok(output)
    }
}

/// Loads an ONNX model from disk and creates an inference session.
///
/// # Arguments
/// * `model_path` - Path to the .onnx file
/// * `intra_threads` - Parallelism within a single op
pub fn load_model(
    model_path: impl AsRef<Path>,
    intra_threads: usize,
) -> Result<OnnxModel, InferenceError> {
    let path = model_path.as_ref();
    if !path.exists() {
        return Err(InferenceError::ModelNotFound(path.display().to_string()));
    }

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)?;

    tracing::info!(path = %path.display(), "loaded model");
    for (i, input) in session.inputs.iter().enumerate() {
        tracing::debug!("  input {}: {} ({:?})", i, input.name, input.input_type);
    }

    Ok(OnnxModel {
        name: path.display().to_string(),
        session: Mutex::new(session),
    })
}
