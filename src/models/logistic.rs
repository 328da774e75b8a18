//! Logistic regression classifier

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Weights for one binary (class-vs-rest) problem
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryFit {
    class: i64,
    weights: Array1<f64>,
    bias: f64,
}

/// L2-regularized logistic regression trained by gradient descent.
///
/// Binary targets get a single sigmoid model; more than two classes fall
/// back to one-vs-rest, picking the class with the largest score at predict
/// time. Expects standardized features; the default learning rate assumes
/// unit-variance inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    fits: Vec<BinaryFit>,
    classes: Vec<i64>,
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            fits: Vec::new(),
            classes: Vec::new(),
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::ValidationError(
                "cannot fit on zero samples".to_string(),
            ));
        }

        let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(PipelineError::TrainingError(
                "target has a single class".to_string(),
            ));
        }
        self.classes = classes;

        if self.classes.len() == 2 {
            // One sigmoid suffices: positive class is the larger label
            let positive = self.classes[1];
            let targets: Array1<f64> = y
                .iter()
                .map(|&v| if v.round() as i64 == positive { 1.0 } else { 0.0 })
                .collect();
            let fit = self.fit_binary(x, &targets, positive);
            self.fits = vec![fit];
        } else {
            self.fits = self
                .classes
                .iter()
                .map(|&class| {
                    let targets: Array1<f64> = y
                        .iter()
                        .map(|&v| if v.round() as i64 == class { 1.0 } else { 0.0 })
                        .collect();
                    self.fit_binary(x, &targets, class)
                })
                .collect();
        }

        Ok(self)
    }

    fn fit_binary(&self, x: &Array2<f64>, targets: &Array1<f64>, class: i64) -> BinaryFit {
        let n_samples = x.nrows() as f64;
        let mut weights: Array1<f64> = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let probs = Self::sigmoid(&linear);

            let errors = &probs - targets;
            let dw = (x.t().dot(&errors) / n_samples) + (self.alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * &dw;
            bias -= self.learning_rate * db;
        }

        BinaryFit {
            class,
            weights,
            bias,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.fits.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.fits[0].weights.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.fits[0].weights.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        if self.classes.len() == 2 {
            let fit = &self.fits[0];
            let probs = Self::sigmoid(&(x.dot(&fit.weights) + fit.bias));
            let (neg, pos) = (self.classes[0], self.classes[1]);
            return Ok(probs.mapv(|p| if p >= 0.5 { pos as f64 } else { neg as f64 }));
        }

        // One-vs-rest: highest per-class score wins
        let scores: Vec<Array1<f64>> = self
            .fits
            .iter()
            .map(|fit| x.dot(&fit.weights) + fit.bias)
            .collect();

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut best = self.fits[0].class;
                let mut best_score = f64::NEG_INFINITY;
                for (fit, score) in self.fits.iter().zip(scores.iter()) {
                    if score[i] > best_score {
                        best_score = score[i];
                        best = fit.class;
                    }
                }
                best as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Fitted class labels in ascending order
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary_separable() {
        let x = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new().with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_multiclass_one_vs_rest() {
        let x = array![
            [-3.0, 0.0],
            [-2.5, 0.1],
            [-2.8, -0.1],
            [0.0, 3.0],
            [0.1, 2.5],
            [-0.1, 2.8],
            [3.0, -3.0],
            [2.5, -2.5],
            [2.8, -2.8],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];

        let mut model = LogisticRegression::new().with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.classes(), &[0, 1, 2]);

        let preds = model.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        assert!(correct >= 8, "only {} of 9 correct", correct);
    }

    #[test]
    fn test_nonzero_class_labels_preserved() {
        let x = array![[-2.0], [-1.5], [1.5], [2.0]];
        let y = array![3.0, 3.0, 7.0, 7.0];

        let mut model = LogisticRegression::new().with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        for p in preds.iter() {
            assert!(*p == 3.0 || *p == 7.0);
        }
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let mut model = LogisticRegression::new();
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
