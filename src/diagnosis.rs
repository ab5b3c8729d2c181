//! Post-processing of model outputs into the verdicts returned to clients.

use crate::error::InferenceError;
use crate::model::{registry::ModelHandles, InferenceModel};
use crate::preprocessing::features::{self, FEATURE_COUNT};
use ndarray::{Array4, ArrayView2, ArrayViewD, Axis};
use serde::Serialize;

/// Index of the largest score. Ties go to the first index; NaN never wins.
pub fn argmax(scores: impl IntoIterator<Item = f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Runs the classifier on a single-image batch and returns the predicted class.
pub fn classify(model: &dyn InferenceModel, tensor: Array4<f32>) -> Result<usize, InferenceError> {
    let output = model.run(tensor.into_dyn())?;
    if output.ndim() == 0 || output.shape()[0] == 0 {
        return Err(InferenceError::UnexpectedOutput(format!(
            "expected a batch of scores, got shape {:?}",
            output.shape()
        )));
    }

    let scores = output.index_axis(Axis(0), 0);
    let class = argmax(scores.iter().copied())
        .ok_or_else(|| InferenceError::UnexpectedOutput("no usable class scores".to_string()))?;

    tracing::debug!(?scores, class, "classification scores");
    Ok(class)
}

/// Mean absolute difference between the model input and its reconstruction.
pub fn reconstruction_error(
    input: ArrayView2<f32>,
    reconstruction: ArrayViewD<f32>,
) -> Result<f32, InferenceError> {
    if input.shape() != reconstruction.shape() {
        return Err(InferenceError::ShapeMismatch {
            expected: input.shape().to_vec(),
            got: reconstruction.shape().to_vec(),
        });
    }

    let total: f32 = input
        .iter()
        .zip(reconstruction.iter())
        .map(|(a, b)| (a - b).abs())
        .sum();
    let error = total / input.len() as f32;

    // Non-finite errors have no verdict
    if !error.is_finite() {
        return Err(InferenceError::UnexpectedOutput(format!(
            "non-finite reconstruction error from {:?}",
            reconstruction
        )));
    }
    Ok(error)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    /// Flags errors strictly above the threshold; equality is "No".
    pub fn from_error(error: f32, threshold: f32) -> Self {
        if error > threshold {
            Verdict::Yes
        } else {
            Verdict::No
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiabetesAssessment {
    pub possible_diabetes: Verdict,
    pub reconstruction_error: f32,
}

/// Scales the two lab values, reconstructs them with the autoencoder and
/// scores the reconstruction against `threshold`.
pub fn assess_diabetes(
    handles: &ModelHandles,
    features: [f32; FEATURE_COUNT],
    threshold: f32,
) -> Result<DiabetesAssessment, InferenceError> {
    let input = features::to_row(features);
    let scaled = handles.scaler.transform(input.view())?;

    let model = handles.reconstructor()?;
    let reconstruction = model.run(scaled.clone().into_dyn())?;
    let error = reconstruction_error(scaled.view(), reconstruction.view())?;

    tracing::debug!(?features, error, "diabetes reconstruction");
    Ok(DiabetesAssessment {
        possible_diabetes: Verdict::from_error(error, threshold),
        reconstruction_error: error,
    })
}
