//! Submission file output

use crate::error::{PipelineError, Result};
use crate::preprocessing::LabelEncoder;
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Build the submission frame: `ID` is the 0-based test row position and
/// `Target` the prediction. When the target column was label-encoded during
/// training, codes decode back to their original string labels.
pub fn build_submission(
    predictions: &Array1<f64>,
    target_column: &str,
    encoder: Option<&LabelEncoder>,
) -> Result<DataFrame> {
    let ids: Vec<i64> = (0..predictions.len() as i64).collect();

    let target: Series = match encoder.filter(|e| e.has_column(target_column)) {
        Some(encoder) => {
            let labels: Vec<String> = predictions
                .iter()
                .map(|&p| {
                    let code = p.round() as i64;
                    encoder
                        .inverse(target_column, code)
                        .map(|s| s.to_string())
                        .ok_or_else(|| {
                            PipelineError::ValidationError(format!(
                                "prediction {} is outside the fitted label range",
                                code
                            ))
                        })
                })
                .collect::<Result<Vec<String>>>()?;
            Series::new("Target".into(), labels)
        }
        None => {
            let codes: Vec<i64> = predictions.iter().map(|&p| p.round() as i64).collect();
            Series::new("Target".into(), codes)
        }
    };

    DataFrame::new(vec![
        Series::new("ID".into(), ids).into(),
        target.into(),
    ])
    .map_err(|e| PipelineError::DataError(e.to_string()))
}

/// Write the submission frame as CSV with a header and no index column
pub fn write_submission(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn fitted_encoder() -> LabelEncoder {
        let df = df!("Target" => &["no", "yes", "no"]).unwrap();
        let mut encoder = LabelEncoder::default();
        encoder.fit(&df, &["Target".to_string()]).unwrap();
        encoder
    }

    #[test]
    fn test_ids_are_row_positions() {
        let preds = array![0.0, 1.0, 0.0];
        let df = build_submission(&preds, "Target", None).unwrap();

        let ids = df.column("ID").unwrap().i64().unwrap();
        let collected: Vec<i64> = ids.into_iter().flatten().collect();
        assert_eq!(collected, vec![0, 1, 2]);
    }

    #[test]
    fn test_predictions_decode_to_labels() {
        let preds = array![0.0, 1.0, 0.0];
        let df = build_submission(&preds, "Target", Some(&fitted_encoder())).unwrap();

        let targets = df.column("Target").unwrap().str().unwrap();
        let collected: Vec<&str> = targets.into_iter().flatten().collect();
        assert_eq!(collected, vec!["no", "yes", "no"]);
    }

    #[test]
    fn test_numeric_target_stays_numeric() {
        let preds = array![2.0, 0.0];
        let df = build_submission(&preds, "Target", None).unwrap();
        assert_eq!(df.column("Target").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_out_of_range_prediction_rejected() {
        let preds = array![5.0];
        assert!(build_submission(&preds, "Target", Some(&fitted_encoder())).is_err());
    }

    #[test]
    fn test_written_file_has_header_and_rows() {
        let preds = array![1.0, 0.0];
        let mut df = build_submission(&preds, "Target", Some(&fitted_encoder())).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("submission.csv");
        write_submission(&mut df, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.trim().lines().collect();
        assert_eq!(lines[0], "ID,Target");
        assert_eq!(lines[1], "0,yes");
        assert_eq!(lines[2], "1,no");
    }
}
