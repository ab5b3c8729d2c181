pub mod loader;
pub mod registry;

use crate::error::InferenceError;
use ndarray::ArrayD;

/// A loaded model that maps one input tensor to one output tensor.
///
/// Implementations must be safe to call from many request handlers at once.
pub trait InferenceModel: Send + Sync {
    fn run(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>, InferenceError>;
}
