//! Classification metrics

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::ValidationError(
            "cannot score zero samples".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of exactly-matching predictions
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t.round() as i64 == p.round() as i64)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Per-class precision/recall/F1 and support
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Full breakdown for one evaluation: per-class rows plus the aggregates
/// a score table needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    pub n_samples: usize,
}

/// Compute the per-class breakdown over the union of true and predicted
/// labels. A class never predicted gets precision 0; a class never observed
/// gets recall 0; both follow the zero-division-is-zero convention.
pub fn classification_report(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> Result<ClassificationReport> {
    check_lengths(y_true, y_pred)?;

    let mut classes: Vec<i64> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|&v| v.round() as i64)
        .collect();
    classes.sort_unstable();
    classes.dedup();

    let mut tp: HashMap<i64, usize> = HashMap::new();
    let mut fp: HashMap<i64, usize> = HashMap::new();
    let mut fn_: HashMap<i64, usize> = HashMap::new();
    let mut support: HashMap<i64, usize> = HashMap::new();

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let (t, p) = (t.round() as i64, p.round() as i64);
        *support.entry(t).or_insert(0) += 1;
        if t == p {
            *tp.entry(t).or_insert(0) += 1;
        } else {
            *fp.entry(p).or_insert(0) += 1;
            *fn_.entry(t).or_insert(0) += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    let per_class: Vec<ClassMetrics> = classes
        .iter()
        .map(|&class| {
            let tp_c = tp.get(&class).copied().unwrap_or(0);
            let fp_c = fp.get(&class).copied().unwrap_or(0);
            let fn_c = fn_.get(&class).copied().unwrap_or(0);

            let precision = ratio(tp_c, tp_c + fp_c);
            let recall = ratio(tp_c, tp_c + fn_c);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };

            ClassMetrics {
                class,
                precision,
                recall,
                f1,
                support: support.get(&class).copied().unwrap_or(0),
            }
        })
        .collect();

    let n_samples = y_true.len();
    let macro_f1 = per_class.iter().map(|m| m.f1).sum::<f64>() / per_class.len() as f64;
    let weighted_f1 = per_class
        .iter()
        .map(|m| m.f1 * m.support as f64)
        .sum::<f64>()
        / n_samples as f64;

    Ok(ClassificationReport {
        per_class,
        accuracy: accuracy(y_true, y_pred)?,
        macro_f1,
        weighted_f1,
        n_samples,
    })
}

/// Support-weighted mean of per-class F1 scores
pub fn weighted_f1(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(classification_report(y_true, y_pred)?.weighted_f1)
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                m.class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy", "", "", self.accuracy, self.n_samples
        )?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.4} {:>10}",
            "macro f1", "", "", self.macro_f1, self.n_samples
        )?;
        write!(
            f,
            "{:>12} {:>10} {:>10} {:>10.4} {:>10}",
            "weighted f1", "", "", self.weighted_f1, self.n_samples
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y_true = array![0.0, 1.0, 1.0, 0.0];
        let y_pred = array![0.0, 1.0, 0.0, 0.0];
        assert!((accuracy(&y_true, &y_pred).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = array![0.0, 1.0, 2.0, 1.0];
        let report = classification_report(&y, &y).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.weighted_f1, 1.0);
        for m in &report.per_class {
            assert_eq!(m.precision, 1.0);
            assert_eq!(m.recall, 1.0);
        }
    }

    #[test]
    fn test_known_binary_breakdown() {
        // class 0: tp=2 fp=1 fn=0 -> p=2/3 r=1
        // class 1: tp=1 fp=0 fn=1 -> p=1 r=1/2
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0, 1.0];
        let report = classification_report(&y_true, &y_pred).unwrap();

        let c0 = &report.per_class[0];
        assert!((c0.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((c0.recall - 1.0).abs() < 1e-12);
        assert_eq!(c0.support, 2);

        let c1 = &report.per_class[1];
        assert!((c1.precision - 1.0).abs() < 1e-12);
        assert!((c1.recall - 0.5).abs() < 1e-12);

        // weighted f1 = (2*0.8 + 2*(2/3)) / 4
        let expected = (2.0 * 0.8 + 2.0 * (2.0 / 3.0)) / 4.0;
        assert!((report.weighted_f1 - expected).abs() < 1e-12);
    }

    #[test]
    fn test_class_never_predicted() {
        let y_true = array![0.0, 1.0, 2.0];
        let y_pred = array![0.0, 1.0, 1.0];
        let report = classification_report(&y_true, &y_pred).unwrap();

        let c2 = report.per_class.iter().find(|m| m.class == 2).unwrap();
        assert_eq!(c2.precision, 0.0);
        assert_eq!(c2.recall, 0.0);
        assert_eq!(c2.f1, 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let y_true = array![0.0, 1.0];
        let y_pred = array![0.0];
        assert!(accuracy(&y_true, &y_pred).is_err());
    }

    #[test]
    fn test_report_renders() {
        let y = array![0.0, 1.0];
        let report = classification_report(&y, &y).unwrap();
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted f1"));
    }
}
