use crate::error::InferenceError;
use ndarray::Array2;
use serde_json::Value;

/// Fasting and post-prandial blood sugar, in that order.
pub const FEATURE_COUNT: usize = 2;

const FORMAT_ERROR: &str = "Invalid input format. 'features' must be a list of two numbers.";

/// Validates the `features` field of a diabetes request.
pub fn parse_features(value: &Value) -> Result<[f32; FEATURE_COUNT], InferenceError> {
    let items = match value.as_array() {
        Some(items) if items.len() == FEATURE_COUNT => items,
        _ => return Err(InferenceError::InvalidFeatures(FORMAT_ERROR.to_string())),
    };

    let mut features = [0.0f32; FEATURE_COUNT];
    for (slot, item) in features.iter_mut().zip(items) {
        *slot = item
            .as_f64()
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                InferenceError::InvalidFeatures(format!(
                    "Invalid feature value {}. 'features' must be a list of two numbers.",
                    item
                ))
            })?;
    }

    Ok(features)
}

/// A single-row batch of shape [1, 2].
pub fn to_row(features: [f32; FEATURE_COUNT]) -> Array2<f32> {
    Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| features[j])
}
