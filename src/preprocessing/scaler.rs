//! Feature standardization

use crate::error::{PipelineError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted feature
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeatureParams {
    mean: f64,
    std: f64,
}

/// Standard (z-score) scaler over a feature matrix.
///
/// Fit on the training partition only; the same statistics transform the
/// validation and test matrices. Zero-variance features keep scale 1.0 so
/// transform never divides by zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<FeatureParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute per-feature mean and standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::PreprocessingError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|col| {
                let mean = col.mean().unwrap_or(0.0);
                let std = col.std(1.0);
                FeatureParams {
                    mean,
                    std: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Standardize a matrix using the fitted statistics
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.params.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, p) in self.params.iter().enumerate() {
            out.column_mut(j).mapv_inplace(|v| (v - p.mean) / p.std);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}
