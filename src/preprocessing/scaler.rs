use crate::error::InferenceError;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Range the fallback scaler is fitted over when no usable scaler is on disk.
pub const FALLBACK_MIN: [f32; 2] = [0.0, 0.0];
pub const FALLBACK_MAX: [f32; 2] = [200.0, 200.0];

/// Per-feature min-max scaling to [0, 1] using stored statistics.
///
/// Persisted as JSON with the attribute names of the usual Python
/// implementation (`data_min`, `data_max`) so exported scalers load as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    #[serde(default)]
    pub data_min: Vec<f32>,
    #[serde(default)]
    pub data_max: Vec<f32>,
}

impl MinMaxScaler {
    /// Learns per-column minimum and maximum from `rows`.
    pub fn fit(rows: ArrayView2<f32>) -> Result<Self, InferenceError> {
        if rows.nrows() == 0 || rows.ncols() == 0 {
            return Err(InferenceError::ScalerError(
                "cannot fit on empty data".to_string(),
            ));
        }

        let (data_min, data_max): (Vec<f32>, Vec<f32>) = rows
            .axis_iter(Axis(1))
            .map(|col| {
                col.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
            })
            .unzip();

        Ok(Self { data_min, data_max })
    }

    pub fn fallback() -> Self {
        Self {
            data_min: FALLBACK_MIN.to_vec(),
            data_max: FALLBACK_MAX.to_vec(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.data_min.is_empty()
            && self.data_min.len() == self.data_max.len()
            && self
                .data_min
                .iter()
                .zip(&self.data_max)
                .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo <= hi)
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    // Constant features get a scale of 1 so they map to 0 instead of NaN.
    fn scales(&self) -> impl Iterator<Item = f32> + '_ {
        self.data_min.iter().zip(&self.data_max).map(|(lo, hi)| {
            let range = hi - lo;
            if range == 0.0 {
                1.0
            } else {
                range
            }
        })
    }

    fn check(&self, x: &ArrayView2<f32>) -> Result<(), InferenceError> {
        if !self.is_fitted() {
            return Err(InferenceError::ScalerError(
                "scaler has no fitted statistics".to_string(),
            ));
        }
        if x.ncols() != self.n_features() {
            return Err(InferenceError::ShapeMismatch {
                expected: vec![x.nrows(), self.n_features()],
                got: x.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// `(x - min) / (max - min)` per feature.
    pub fn transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, InferenceError> {
        self.check(&x)?;

        let mut out = x.to_owned();
        for ((mut col, &lo), scale) in out
            .axis_iter_mut(Axis(1))
            .zip(&self.data_min)
            .zip(self.scales())
        {
            col.mapv_inplace(|v| (v - lo) / scale);
        }
        Ok(out)
    }

    pub fn inverse_transform(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, InferenceError> {
        self.check(&x)?;

        let mut out = x.to_owned();
        for ((mut col, &lo), scale) in out
            .axis_iter_mut(Axis(1))
            .zip(&self.data_min)
            .zip(self.scales())
        {
            col.mapv_inplace(|v| v * scale + lo);
        }
        Ok(out)
    }

    /// Reads a persisted scaler. Files without fitted statistics are rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::ScalerError(format!("{}: {}", path.display(), e)))?;
        let scaler: Self = serde_json::from_str(&content)
            .map_err(|e| InferenceError::ScalerError(format!("{}: {}", path.display(), e)))?;

        if !scaler.is_fitted() {
            return Err(InferenceError::ScalerError(format!(
                "{} has no fitted statistics",
                path.display()
            )));
        }
        Ok(scaler)
    }

    /// Like [`MinMaxScaler::load`], but never fails: any problem is logged and
    /// the fallback range is used instead.
    pub fn load_or_fallback(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(scaler) => {
                tracing::info!(path = %path.as_ref().display(), "loaded scaler");
                scaler
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "error loading scaler, fitting default over {:?}..{:?}",
                    FALLBACK_MIN,
                    FALLBACK_MAX
                );
                Self::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fallback_matches_fit_over_fallback_range() {
        let fitted = MinMaxScaler::fit(array![[0.0, 0.0], [200.0, 200.0]].view()).unwrap();
        assert_eq!(fitted, MinMaxScaler::fallback());
    }

    #[test]
    fn test_fallback_scales_midpoint() {
        let scaler = MinMaxScaler::fallback();
        let scaled = scaler.transform(array![[100.0, 100.0]].view()).unwrap();
        assert_eq!(scaled, array![[0.5, 0.5]]);
    }

    #[test]
    fn test_fit_per_column() {
        let scaler =
            MinMaxScaler::fit(array![[70.0, 110.0], [126.0, 200.0], [90.0, 140.0]].view())
                .unwrap();
        assert_eq!(scaler.data_min, vec![70.0, 110.0]);
        assert_eq!(scaler.data_max, vec![126.0, 200.0]);
    }

    #[test]
    fn test_fit_empty_fails() {
        let empty = Array2::<f32>::zeros((0, 2));
        assert!(MinMaxScaler::fit(empty.view()).is_err());
    }

    #[test]
    fn test_round_trip_recovers_input() {
        let scaler = MinMaxScaler {
            data_min: vec![60.0, 80.0],
            data_max: vec![250.0, 400.0],
        };
        for row in [[60.0, 80.0], [99.5, 140.0], [250.0, 400.0], [300.0, 10.0]] {
            let x = array![[row[0], row[1]]];
            let scaled = scaler.transform(x.view()).unwrap();
            let back = scaler.inverse_transform(scaled.view()).unwrap();
            for (a, b) in x.iter().zip(back.iter()) {
                assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_constant_feature_does_not_divide_by_zero() {
        let scaler = MinMaxScaler {
            data_min: vec![5.0, 0.0],
            data_max: vec![5.0, 10.0],
        };
        let scaled = scaler.transform(array![[5.0, 5.0]].view()).unwrap();
        assert_eq!(scaled, array![[0.0, 0.5]]);
    }

    #[test]
    fn test_unfitted_scaler_refuses_transform() {
        let scaler = MinMaxScaler::default();
        assert!(!scaler.is_fitted());
        match scaler.transform(array![[1.0, 2.0]].view()) {
            Err(InferenceError::ScalerError(_)) => {}
            _ => panic!("Expected ScalerError"),
        }
    }

    #[test]
    fn test_feature_count_mismatch() {
        let scaler = MinMaxScaler::fallback();
        match scaler.transform(array![[1.0, 2.0, 3.0]].view()) {
            Err(InferenceError::ShapeMismatch { expected, got }) => {
                assert_eq!(expected, vec![1, 2]);
                assert_eq!(got, vec![1, 3]);
            }
            _ => panic!("Expected ShapeMismatch"),
        }
    }

    #[test]
    fn test_load_exported_scaler() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            br#"{"data_min": [50.0, 70.0], "data_max": [300.0, 450.0]}"#,
        )
        .unwrap();
        let scaler = MinMaxScaler {
            data_min: vec![50.0, 70.0],
            data_max: vec![300.0, 450.0],
        };

        assert_eq!(MinMaxScaler::load(file.path()).unwrap(), scaler);
    }

    #[test]
    fn test_load_or_fallback_on_corrupt_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"\x80\x04pickle").unwrap();

        assert_eq!(
            MinMaxScaler::load_or_fallback(file.path()),
            MinMaxScaler::fallback()
        );
    }

    #[test]
    fn test_load_or_fallback_on_unfitted_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), br#"{"data_min": [], "data_max": []}"#).unwrap();

        assert!(MinMaxScaler::load(file.path()).is_err());
        assert_eq!(
            MinMaxScaler::load_or_fallback(file.path()),
            MinMaxScaler::fallback()
        );
    }
}
