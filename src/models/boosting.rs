//! Gradient boosted classifier

use super::tree::DecisionTree;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Boosting rounds per binary problem
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f64,
    /// Depth of the residual trees
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row fraction per round; 1.0 disables subsampling
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

/// One boosted binary (class-vs-rest) model: an initial log-odds estimate
/// plus a sequence of regression trees fit to log-loss gradients
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoostedBinary {
    class: i64,
    initial_log_odds: f64,
    trees: Vec<DecisionTree>,
}

impl BoostedBinary {
    fn fit(
        x: &Array2<f64>,
        targets: &Array1<f64>,
        class: i64,
        config: &BoostingConfig,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<Self> {
        let n_samples = x.nrows();

        let p = targets.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        let initial_log_odds = (p / (1.0 - p)).ln();
        let mut log_odds = Array1::from_elem(n_samples, initial_log_odds);

        let mut trees = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let residuals: Array1<f64> = targets
                .iter()
                .zip(log_odds.iter())
                .map(|(&yi, &lo)| yi - 1.0 / (1.0 + (-lo).exp()))
                .collect();

            let rows = subsample_rows(n_samples, config.subsample, rng);
            let x_sub = x.select(Axis(0), &rows);
            let r_sub = Array1::from_vec(rows.iter().map(|&i| residuals[i]).collect());

            let mut tree = DecisionTree::regressor()
                .with_max_depth(Some(config.max_depth))
                .with_min_samples_leaf(config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            // Update running log-odds over the full set so later rounds see
            // this tree's contribution everywhere
            let contribution = tree.predict(x)?;
            for i in 0..n_samples {
                log_odds[i] += config.learning_rate * contribution[i];
            }
            trees.push(tree);
        }

        Ok(Self {
            class,
            initial_log_odds,
            trees,
        })
    }

    fn decision(&self, x: &Array2<f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let contribution = tree.predict(x)?;
            for i in 0..x.nrows() {
                log_odds[i] += learning_rate * contribution[i];
            }
        }
        Ok(log_odds)
    }
}

fn subsample_rows(n: usize, fraction: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let size = (((n as f64) * fraction).ceil() as usize).max(1);
    let mut rows: Vec<usize> = (0..n).collect();
    rows.shuffle(rng);
    rows.truncate(size);
    rows.sort_unstable();
    rows
}

/// Gradient boosted trees for classification.
///
/// Binary targets train one boosted model on log-loss gradients; multiclass
/// targets train one model per class (one-vs-rest) and predict the class
/// with the largest decision value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub config: BoostingConfig,
    fits: Vec<BoostedBinary>,
    classes: Vec<i64>,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

impl GradientBoosting {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            fits: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
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

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        if self.classes.len() == 2 {
            let positive = self.classes[1];
            let targets: Array1<f64> = y
                .iter()
                .map(|&v| if v.round() as i64 == positive { 1.0 } else { 0.0 })
                .collect();
            self.fits = vec![BoostedBinary::fit(
                x,
                &targets,
                positive,
                &self.config,
                &mut rng,
            )?];
        } else {
            self.fits = self
                .classes
                .iter()
                .map(|&class| {
                    let targets: Array1<f64> = y
                        .iter()
                        .map(|&v| if v.round() as i64 == class { 1.0 } else { 0.0 })
                        .collect();
                    BoostedBinary::fit(x, &targets, class, &self.config, &mut rng)
                })
                .collect::<Result<Vec<_>>>()?;
        }

        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.fits.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        if self.classes.len() == 2 {
            let log_odds = self.fits[0].decision(x, self.config.learning_rate)?;
            let (neg, pos) = (self.classes[0], self.classes[1]);
            return Ok(log_odds.mapv(|lo| if lo >= 0.0 { pos as f64 } else { neg as f64 }));
        }

        let decisions: Vec<Array1<f64>> = self
            .fits
            .iter()
            .map(|fit| fit.decision(x, self.config.learning_rate))
            .collect::<Result<Vec<_>>>()?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut best = self.fits[0].class;
                let mut best_score = f64::NEG_INFINITY;
                for (fit, decision) in self.fits.iter().zip(decisions.iter()) {
                    if decision[i] > best_score {
                        best_score = decision[i];
                        best = fit.class;
                    }
                }
                best as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_config() -> BoostingConfig {
        BoostingConfig {
            n_estimators: 20,
            max_depth: 2,
            ..BoostingConfig::default()
        }
    }

    #[test]
    fn test_binary_separable() {
        let x = array![[0.0], [0.5], [1.0], [5.0], [5.5], [6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = GradientBoosting::new(small_config());
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_multiclass() {
        let x = array![
            [0.0],
            [0.3],
            [0.6],
            [5.0],
            [5.3],
            [5.6],
            [10.0],
            [10.3],
            [10.6],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];

        let mut model = GradientBoosting::new(small_config());
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
    fn test_seeded_fit_is_deterministic() {
        let x = array![[0.0], [1.0], [2.0], [5.0], [6.0], [7.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let config = BoostingConfig {
            subsample: 0.8,
            ..small_config()
        };
        let mut a = GradientBoosting::new(config.clone());
        a.fit(&x, &y).unwrap();
        let mut b = GradientBoosting::new(config);
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_before_fit() {
        let model = GradientBoosting::default();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
