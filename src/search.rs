//! Hyperparameter grid search for the random forest

use crate::error::{PipelineError, Result};
use crate::metrics::accuracy;
use crate::models::RandomForest;
use crate::split::stratified_kfold;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One point in the forest hyperparameter grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl ForestParams {
    pub fn build(&self, seed: u64) -> RandomForest {
        RandomForest::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_random_state(seed)
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}, min_samples_leaf={}",
            self.n_estimators,
            self.max_depth
                .map_or_else(|| "None".to_string(), |d| d.to_string()),
            self.min_samples_split,
            self.min_samples_leaf
        )
    }
}

/// The grid the search explores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![50, 100],
            max_depth: vec![None, Some(10)],
            min_samples_split: vec![2, 5],
            min_samples_leaf: vec![1, 2],
        }
    }
}

impl ForestGrid {
    /// Expand to the full cross product, in grid order: n_estimators varies
    /// slowest, min_samples_leaf fastest
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        out.push(ForestParams {
                            n_estimators,
                            max_depth,
                            min_samples_split,
                            min_samples_leaf,
                        });
                    }
                }
            }
        }
        out
    }
}

/// Cross-validated score for one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub params: ForestParams,
    /// Per-fold validation accuracies
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

/// Result of a full grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Every candidate with its score, in grid order
    pub trials: Vec<Trial>,
    pub best_params: ForestParams,
    pub best_score: f64,
}

/// Grid search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearch {
    pub grid: ForestGrid,
    pub n_folds: usize,
    pub seed: u64,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            grid: ForestGrid::default(),
            n_folds: 3,
            seed: 42,
        }
    }
}

impl GridSearch {
    /// Score every candidate with stratified k-fold cross-validation and pick
    /// the best mean accuracy. Candidates evaluate in parallel; score ties
    /// resolve to the earlier candidate in grid order.
    pub fn run(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchOutcome> {
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(PipelineError::ValidationError(
                "hyperparameter grid is empty".to_string(),
            ));
        }

        let folds = stratified_kfold(y, self.n_folds, self.seed)?;

        let trials: Vec<Trial> = candidates
            .into_par_iter()
            .map(|params| {
                let fold_scores = folds
                    .iter()
                    .map(|fold| {
                        let x_train = x.select(Axis(0), &fold.train);
                        let y_train =
                            Array1::from_vec(fold.train.iter().map(|&i| y[i]).collect());
                        let x_val = x.select(Axis(0), &fold.test);
                        let y_val =
                            Array1::from_vec(fold.test.iter().map(|&i| y[i]).collect());

                        let mut forest = params.build(self.seed);
                        forest.fit(&x_train, &y_train)?;
                        accuracy(&y_val, &forest.predict(&x_val)?)
                    })
                    .collect::<Result<Vec<f64>>>()?;

                let n = fold_scores.len() as f64;
                let mean_score = fold_scores.iter().sum::<f64>() / n;
                let std_score = (fold_scores
                    .iter()
                    .map(|s| (s - mean_score).powi(2))
                    .sum::<f64>()
                    / n)
                    .sqrt();
                Ok(Trial {
                    params,
                    fold_scores,
                    mean_score,
                    std_score,
                })
            })
            .collect::<Result<Vec<Trial>>>()?;

        // Strict > keeps the first candidate on ties
        let mut best = &trials[0];
        for trial in &trials[1..] {
            if trial.mean_score > best.mean_score {
                best = trial;
            }
        }

        Ok(SearchOutcome {
            best_params: best.params,
            best_score: best.mean_score,
            trials,
        })
    }
}
