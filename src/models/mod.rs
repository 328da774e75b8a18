//! Classifier implementations and dispatch

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod tree;

pub use boosting::{BoostingConfig, GradientBoosting};
pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use tree::{DecisionTree, SplitCriterion};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// The model families the pipeline trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
}

impl ClassifierKind {
    /// All families, in training order
    pub const ALL: [ClassifierKind; 4] = [
        ClassifierKind::LogisticRegression,
        ClassifierKind::DecisionTree,
        ClassifierKind::RandomForest,
        ClassifierKind::GradientBoosting,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::LogisticRegression => "Logistic Regression",
            ClassifierKind::DecisionTree => "Decision Tree",
            ClassifierKind::RandomForest => "Random Forest",
            ClassifierKind::GradientBoosting => "Gradient Boosting",
        }
    }
}

/// A trained (or trainable) model of one of the supported families.
///
/// The variant set is closed on purpose: everything downstream (evaluation,
/// grid search, submission) matches on this enum rather than dispatching
/// through a trait object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    Logistic(LogisticRegression),
    Tree(DecisionTree),
    Forest(RandomForest),
    Boosting(GradientBoosting),
}

impl Classifier {
    /// A model of the given family with baseline hyperparameters
    pub fn baseline(kind: ClassifierKind, seed: u64) -> Self {
        match kind {
            ClassifierKind::LogisticRegression => {
                Classifier::Logistic(LogisticRegression::new().with_max_iter(1000))
            }
            ClassifierKind::DecisionTree => {
                Classifier::Tree(DecisionTree::classifier().with_random_state(seed))
            }
            ClassifierKind::RandomForest => {
                Classifier::Forest(RandomForest::new(100).with_random_state(seed))
            }
            ClassifierKind::GradientBoosting => {
                Classifier::Boosting(GradientBoosting::new(BoostingConfig {
                    random_state: Some(seed),
                    ..BoostingConfig::default()
                }))
            }
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::Logistic(_) => ClassifierKind::LogisticRegression,
            Classifier::Tree(_) => ClassifierKind::DecisionTree,
            Classifier::Forest(_) => ClassifierKind::RandomForest,
            Classifier::Boosting(_) => ClassifierKind::GradientBoosting,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::Logistic(m) => m.fit(x, y).map(|_| ()),
            Classifier::Tree(m) => m.fit(x, y).map(|_| ()),
            Classifier::Forest(m) => m.fit(x, y).map(|_| ()),
            Classifier::Boosting(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::Logistic(m) => m.predict(x),
            Classifier::Tree(m) => m.predict(x),
            Classifier::Forest(m) => m.predict(x),
            Classifier::Boosting(m) => m.predict(x),
        }
    }
}
