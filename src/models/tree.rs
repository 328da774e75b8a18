//! Decision tree classifier and regression tree

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity (classification)
    Gini,
    /// Variance reduction (regression, used for boosting residuals)
    Variance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Branch {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART-style binary tree.
///
/// Splits are midpoints between consecutive sorted feature values; the split
/// with the largest impurity decrease wins. Candidate features are scanned in
/// parallel. With `max_features` set, each split considers a seeded random
/// subset of features (used by the forest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<Node>,
    pub criterion: SplitCriterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::classifier()
    }
}

impl DecisionTree {
    pub fn classifier() -> Self {
        Self {
            root: None,
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
        }
    }

    pub fn regressor() -> Self {
        Self {
            criterion: SplitCriterion::Variance,
            ..Self::classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_max_features(mut self, n: Option<usize>) -> Self {
        self.max_features = n;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
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
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.grow(x, y, &indices, 0, &mut rng));
        Ok(self)
    }

    fn grow(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let labels: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let at_limit = self.max_depth.map_or(false, |d| depth >= d);
        if at_limit
            || indices.len() < self.min_samples_split
            || indices.len() <= self.min_samples_leaf
            || Self::is_pure(&labels)
        {
            return self.leaf(&labels, indices.len());
        }

        let split = match self.best_split(x, y, indices, rng) {
            Some(s) => s,
            None => return self.leaf(&labels, indices.len()),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature]] <= split.threshold);

        if left_idx.len() < self.min_samples_leaf || right_idx.len() < self.min_samples_leaf {
            return self.leaf(&labels, indices.len());
        }

        Node::Branch {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(x, y, &left_idx, depth + 1, rng)),
            right: Box::new(self.grow(x, y, &right_idx, depth + 1, rng)),
        }
    }

    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<CandidateSplit> {
        let n_features = x.ncols();
        let candidates: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => sample(rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        };

        let labels: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&labels);

        candidates
            .into_par_iter()
            .filter_map(|feature| self.scan_feature(x, y, indices, feature, parent_impurity))
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // Break gain ties by feature index so fits are repeatable
                    .then(b.feature.cmp(&a.feature))
            })
    }

    fn scan_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature: usize,
        parent_impurity: f64,
    ) -> Option<CandidateSplit> {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        let n = indices.len() as f64;
        let mut best: Option<CandidateSplit> = None;

        for window in values.windows(2) {
            let threshold = (window[0] + window[1]) / 2.0;

            let mut left = Vec::new();
            let mut right = Vec::new();
            for &i in indices {
                if x[[i, feature]] <= threshold {
                    left.push(y[i]);
                } else {
                    right.push(y[i]);
                }
            }

            if left.len() < self.min_samples_leaf || right.len() < self.min_samples_leaf {
                continue;
            }

            let weighted = (left.len() as f64 * self.impurity(&left)
                + right.len() as f64 * self.impurity(&right))
                / n;
            let gain = parent_impurity - weighted;

            if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(CandidateSplit {
                    feature,
                    threshold,
                    gain,
                });
            }
        }

        best
    }

    fn impurity(&self, labels: &[f64]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        match self.criterion {
            SplitCriterion::Gini => {
                let n = labels.len() as f64;
                let mut counts: HashMap<i64, usize> = HashMap::new();
                for &v in labels {
                    *counts.entry(v.round() as i64).or_insert(0) += 1;
                }
                1.0 - counts
                    .values()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            SplitCriterion::Variance => {
                let n = labels.len() as f64;
                let mean = labels.iter().sum::<f64>() / n;
                labels.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
            }
        }
    }

    fn leaf(&self, labels: &[f64], n_samples: usize) -> Node {
        let value = match self.criterion {
            SplitCriterion::Gini => {
                // Majority class, ties broken by smaller label
                let mut counts: HashMap<i64, usize> = HashMap::new();
                for &v in labels {
                    *counts.entry(v.round() as i64).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .max_by_key(|&(class, count)| (count, std::cmp::Reverse(class)))
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            }
            SplitCriterion::Variance => {
                if labels.is_empty() {
                    0.0
                } else {
                    labels.iter().sum::<f64>() / labels.len() as f64
                }
            }
        };
        Node::Leaf { value, n_samples }
    }

    fn is_pure(labels: &[f64]) -> bool {
        labels
            .first()
            .map_or(true, |&first| labels.iter().all(|&v| (v - first).abs() < 1e-12))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let row = x.row(i);
                let mut node = root;
                loop {
                    match node {
                        Node::Leaf { value, .. } => return *value,
                        Node::Branch {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            node = if row[*feature] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Branch { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }
}

#[derive(Debug, Clone, Copy)]
struct CandidateSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_classes() {
        let x = array![[0.0], [0.2], [0.4], [2.0], [2.2], [2.4]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::classifier();
        tree.fit(&x, &y).unwrap();
        let preds = tree.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::classifier().with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();
        assert!(tree.depth() <= 3); // root at depth 0, splits at most twice
    }

    #[test]
    fn test_regression_leaf_is_mean() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 3.0];

        let mut tree = DecisionTree::regressor();
        tree.fit(&x, &y).unwrap();
        let preds = tree.predict(&x).unwrap();
        // No valid split: single leaf predicting the mean
        for p in preds {
            assert!((p - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::classifier().with_min_samples_leaf(3);
        tree.fit(&x, &y).unwrap();
        // No split can leave 3 per side: degenerates to one leaf
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::classifier();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut tree = DecisionTree::classifier();
        let x = array![[1.0], [2.0]];
        let y = array![0.0];
        assert!(tree.fit(&x, &y).is_err());
    }
}
