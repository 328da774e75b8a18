//! End-to-end training pipeline

use crate::data::{column_to_vector, columns_to_matrix, feature_columns, load_csv};
use crate::error::{PipelineError, Result};
use crate::metrics::{classification_report, ClassificationReport};
use crate::models::{Classifier, ClassifierKind};
use crate::preprocessing::{FallbackPolicy, Imputer, LabelEncoder, StandardScaler, UnseenPolicy};
use crate::search::{GridSearch, SearchOutcome};
use crate::split::stratified_split;
use crate::submission::{build_submission, write_submission};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Everything the pipeline needs to run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub output_path: PathBuf,
    pub target_column: String,
    /// Fraction of training rows held out for validation
    pub test_size: f64,
    pub seed: u64,
    pub unseen_policy: UnseenPolicy,
    pub fallback_policy: FallbackPolicy,
    pub search: GridSearch,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("train.csv"),
            test_path: PathBuf::from("test.csv"),
            output_path: PathBuf::from("submission.csv"),
            target_column: "Target".to_string(),
            test_size: 0.2,
            seed: 42,
            unseen_policy: UnseenPolicy::Error,
            fallback_policy: FallbackPolicy::FitOnTest,
            search: GridSearch::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.search.seed = seed;
        self
    }
}

/// Validation scores for one baseline model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub kind: ClassifierKind,
    pub report: ClassificationReport,
}

/// What a full run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub baselines: Vec<ModelEvaluation>,
    pub search: SearchOutcome,
    /// Validation scores for the refit best forest
    pub tuned: ClassificationReport,
    pub n_train_rows: usize,
    pub n_test_rows: usize,
}

/// The full batch run: load, impute, encode, split, scale, fit baselines,
/// grid-search the forest, predict the test table, write the submission.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    info!(path = %config.train_path.display(), "loading training table");
    let train_raw = load_csv(&config.train_path)?;
    info!(path = %config.test_path.display(), "loading test table");
    let test_raw = load_csv(&config.test_path)?;

    if train_raw.column(&config.target_column).is_err() {
        return Err(PipelineError::ColumnNotFound(config.target_column.clone()));
    }

    // Each table gets its own imputer: fill statistics are per-table
    info!("imputing missing values");
    let train_df = Imputer::new().fit_transform(&train_raw)?;
    let test_df = Imputer::new().fit_transform(&test_raw)?;

    info!("encoding categorical columns");
    let mut encoder = LabelEncoder::new(config.unseen_policy);
    let train_categoricals = crate::data::categorical_columns(&train_df);
    let train_df = encoder.fit_transform(&train_df, &train_categoricals)?;
    let test_df = encoder.transform_with_fallback(&test_df, config.fallback_policy)?;

    let features = feature_columns(&train_df, &config.target_column);
    let x_full = columns_to_matrix(&train_df, &features)?;
    let y_full = column_to_vector(&train_df, &config.target_column)?;
    let x_test = columns_to_matrix(&test_df, &features)?;

    info!(
        rows = x_full.nrows(),
        features = features.len(),
        "splitting train/validation"
    );
    let split = stratified_split(&y_full, config.test_size, config.seed)?;
    let x_train = x_full.select(Axis(0), &split.train);
    let y_train = select_vec(&y_full, &split.train);
    let x_val = x_full.select(Axis(0), &split.test);
    let y_val = select_vec(&y_full, &split.test);

    // Scaling statistics come from the training partition only
    info!("standardizing features");
    let mut scaler = StandardScaler::new();
    let x_train = scaler.fit_transform(&x_train)?;
    let x_val = scaler.transform(&x_val)?;
    let x_test = scaler.transform(&x_test)?;

    let mut baselines = Vec::new();
    for kind in ClassifierKind::ALL {
        info!(model = kind.name(), "fitting baseline");
        let mut model = Classifier::baseline(kind, config.seed);
        model.fit(&x_train, &y_train)?;
        let preds = model.predict(&x_val)?;
        let report = classification_report(&y_val, &preds)?;
        info!(
            model = kind.name(),
            accuracy = report.accuracy,
            weighted_f1 = report.weighted_f1,
            "baseline scored"
        );
        baselines.push(ModelEvaluation { kind, report });
    }

    info!(
        candidates = config.search.grid.candidates().len(),
        folds = config.search.n_folds,
        "grid searching the random forest"
    );
    let search = config.search.run(&x_train, &y_train)?;
    info!(
        best = %search.best_params,
        cv_accuracy = search.best_score,
        "grid search done"
    );

    // Refit the winner on the whole training partition
    let mut best_forest = search.best_params.build(config.seed);
    best_forest.fit(&x_train, &y_train)?;
    let tuned = classification_report(&y_val, &best_forest.predict(&x_val)?)?;
    info!(
        accuracy = tuned.accuracy,
        weighted_f1 = tuned.weighted_f1,
        "tuned forest scored"
    );

    info!(rows = x_test.nrows(), "predicting the test table");
    let predictions = best_forest.predict(&x_test)?;

    let mut submission = build_submission(&predictions, &config.target_column, Some(&encoder))?;
    write_submission(&mut submission, &config.output_path)?;
    info!(path = %config.output_path.display(), "submission written");

    Ok(PipelineReport {
        baselines,
        search,
        tuned,
        n_train_rows: x_full.nrows(),
        n_test_rows: x_test.nrows(),
    })
}

fn select_vec(v: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| v[i]).collect())
}

impl PipelineReport {
    /// Human-readable score summary for stdout
    pub fn render(&self) -> String {
        let mut out = String::new();
        for eval in &self.baselines {
            out.push_str(&format!(
                "=== {} ===\naccuracy: {:.4}  weighted F1: {:.4}\n{}\n\n",
                eval.kind.name(),
                eval.report.accuracy,
                eval.report.weighted_f1,
                eval.report
            ));
        }
        out.push_str("=== Grid search (Random Forest) ===\n");
        for trial in &self.search.trials {
            out.push_str(&format!(
                "{}  cv accuracy: {:.4} ± {:.4}\n",
                trial.params, trial.mean_score, trial.std_score
            ));
        }
        out.push_str(&format!(
            "\nbest: {}  cv accuracy: {:.4}\n\n=== Tuned Random Forest ===\naccuracy: {:.4}  weighted F1: {:.4}\n{}\n",
            self.search.best_params,
            self.search.best_score,
            self.tuned.accuracy,
            self.tuned.weighted_f1,
            self.tuned
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.target_column, "Target");
        assert_eq!(config.search.n_folds, 3);
        assert_eq!(config.search.grid.candidates().len(), 16);
    }

    #[test]
    fn test_with_seed_propagates_to_search() {
        let config = PipelineConfig::default().with_seed(7);
        assert_eq!(config.seed, 7);
        assert_eq!(config.search.seed, 7);
    }

    #[test]
    fn test_select_vec() {
        let v = ndarray::array![10.0, 20.0, 30.0];
        let picked = select_vec(&v, &[2, 0]);
        assert_eq!(picked, ndarray::array![30.0, 10.0]);
    }
}
