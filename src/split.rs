//! Stratified data splitting

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Row indices for a single train/validation partition
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn group_by_class(y: &Array1<f64>) -> HashMap<i64, Vec<usize>> {
    let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, &label) in y.iter().enumerate() {
        groups.entry(label.round() as i64).or_default().push(i);
    }
    groups
}

/// Stratified holdout split: each class contributes `test_size` of its rows
/// to the test partition, so class proportions survive the split.
///
/// Shuffling is seeded, so the same `(y, test_size, seed)` always yields the
/// same partition.
pub fn stratified_split(y: &Array1<f64>, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(PipelineError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if y.is_empty() {
        return Err(PipelineError::ValidationError(
            "cannot split an empty target".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let groups = group_by_class(y);

    // Deterministic class order regardless of HashMap iteration
    let mut classes: Vec<i64> = groups.keys().copied().collect();
    classes.sort_unstable();

    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in classes {
        let mut indices = groups[&class].clone();
        if indices.len() < 2 {
            return Err(PipelineError::ValidationError(format!(
                "class {} has fewer than 2 members; cannot stratify",
                class
            )));
        }
        indices.shuffle(&mut rng);

        let n_test = ((indices.len() as f64) * test_size).round() as usize;
        let n_test = n_test.clamp(1, indices.len() - 1);

        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(SplitIndices { train, test })
}

/// Stratified k-fold partitions for cross-validation.
///
/// Each class's rows are shuffled once and dealt round-robin across folds,
/// so every fold sees roughly the class distribution of the whole set.
pub fn stratified_kfold(y: &Array1<f64>, n_folds: usize, seed: u64) -> Result<Vec<SplitIndices>> {
    if n_folds < 2 {
        return Err(PipelineError::ValidationError(format!(
            "need at least 2 folds, got {}",
            n_folds
        )));
    }
    if y.len() < n_folds {
        return Err(PipelineError::ValidationError(format!(
            "cannot make {} folds from {} rows",
            n_folds,
            y.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let groups = group_by_class(y);

    let mut classes: Vec<i64> = groups.keys().copied().collect();
    classes.sort_unstable();

    let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); n_folds];
    for class in classes {
        let mut indices = groups[&class].clone();
        indices.shuffle(&mut rng);
        for (i, idx) in indices.into_iter().enumerate() {
            fold_members[i % n_folds].push(idx);
        }
    }

    let folds = (0..n_folds)
        .map(|k| {
            let mut test = fold_members[k].clone();
            let mut train: Vec<usize> = fold_members
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != k)
                .flat_map(|(_, members)| members.iter().copied())
                .collect();
            train.sort_unstable();
            test.sort_unstable();
            SplitIndices { train, test }
        })
        .collect();

    Ok(folds)
}
