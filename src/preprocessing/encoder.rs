//! Categorical label encoding

use crate::data::categorical_columns;
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do when transform meets a category absent from the fitted mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnseenPolicy {
    /// Fail the run (the reference behavior)
    Error,
    /// Map to a reserved code one past the fitted range
    Unknown,
}

/// What to do with a categorical column that has no fitted mapping at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackPolicy {
    /// Fit a fresh mapping on the frame being transformed (the reference
    /// behavior; inconsistent with fit-on-train-apply-to-test)
    FitOnTest,
    /// Reject the column-set mismatch
    Error,
}

/// Integer-code mapping for a single column.
/// Codes are assigned in sorted category order, contiguous from 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnMapping {
    codes: HashMap<String, i64>,
    labels: Vec<String>,
}

impl ColumnMapping {
    fn fit(series: &Series) -> Result<Self> {
        let ca = series
            .str()
            .map_err(|e| PipelineError::DataError(e.to_string()))?;

        let mut labels: Vec<String> = ca
            .into_iter()
            .flatten()
            .map(|s| s.to_string())
            .collect();
        labels.sort();
        labels.dedup();

        let codes = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i as i64))
            .collect();

        Ok(Self { codes, labels })
    }
}

/// Per-column label encoder, fit on training data and applied to test data.
///
/// The mapping is a bijection from observed categories to `0..n` in sorted
/// category order. Unseen categories and unmapped columns are handled by the
/// explicit policies above, never by hidden branching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    mappings: HashMap<String, ColumnMapping>,
    unseen_policy: UnseenPolicy,
    is_fitted: bool,
}

impl Default for LabelEncoder {
    fn default() -> Self {
        Self::new(UnseenPolicy::Error)
    }
}

impl LabelEncoder {
    pub fn new(unseen_policy: UnseenPolicy) -> Self {
        Self {
            mappings: HashMap::new(),
            unseen_policy,
            is_fitted: false,
        }
    }

    /// Fit one mapping per named column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| PipelineError::ColumnNotFound(col_name.clone()))?;
            let mapping = ColumnMapping::fit(column.as_materialized_series())?;
            self.mappings.insert(col_name.clone(), mapping);
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace every mapped column present in the frame with its codes
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, mapping) in &self.mappings {
            let column = match df.column(col_name) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let encoded = self.encode_series(col_name, column.as_materialized_series(), mapping)?;
            result = result
                .with_column(encoded)
                .map_err(|e| PipelineError::DataError(e.to_string()))?
                .clone();
        }
        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Transform a frame that may contain categorical columns the encoder has
    /// never seen. Mapped columns are encoded normally; unmapped categorical
    /// columns follow `fallback`.
    pub fn transform_with_fallback(
        &mut self,
        df: &DataFrame,
        fallback: FallbackPolicy,
    ) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();
        for col_name in categorical_columns(df) {
            let column = df
                .column(&col_name)
                .map_err(|_| PipelineError::ColumnNotFound(col_name.clone()))?;
            let series = column.as_materialized_series().clone();

            if !self.mappings.contains_key(&col_name) {
                match fallback {
                    FallbackPolicy::FitOnTest => {
                        tracing::warn!(
                            column = %col_name,
                            "no training mapping for column; fitting on test data"
                        );
                        let mapping = ColumnMapping::fit(&series)?;
                        self.mappings.insert(col_name.clone(), mapping);
                    }
                    FallbackPolicy::Error => {
                        return Err(PipelineError::PreprocessingError(format!(
                            "column {} was not categorical during training",
                            col_name
                        )))
                    }
                }
            }
            let mapping = self.mappings.get(&col_name).ok_or_else(|| {
                PipelineError::PreprocessingError(format!("no mapping for column {}", col_name))
            })?;

            let encoded = self.encode_series(&col_name, &series, mapping)?;
            result = result
                .with_column(encoded)
                .map_err(|e| PipelineError::DataError(e.to_string()))?
                .clone();
        }
        Ok(result)
    }

    fn encode_series(
        &self,
        col_name: &str,
        series: &Series,
        mapping: &ColumnMapping,
    ) -> Result<Series> {
        let ca = series
            .str()
            .map_err(|e| PipelineError::DataError(e.to_string()))?;

        let codes: Vec<i64> = ca
            .into_iter()
            .map(|opt| {
                let value = opt.ok_or_else(|| {
                    PipelineError::PreprocessingError(format!(
                        "null in column {} reached the encoder; impute first",
                        col_name
                    ))
                })?;
                match mapping.codes.get(value) {
                    Some(&code) => Ok(code),
                    None => match self.unseen_policy {
                        UnseenPolicy::Error => Err(PipelineError::UnseenCategory {
                            column: col_name.to_string(),
                            value: value.to_string(),
                        }),
                        UnseenPolicy::Unknown => Ok(mapping.labels.len() as i64),
                    },
                }
            })
            .collect::<Result<Vec<i64>>>()?;

        Ok(Series::new(series.name().clone(), codes))
    }

    /// Whether a mapping was fit for this column
    pub fn has_column(&self, col_name: &str) -> bool {
        self.mappings.contains_key(col_name)
    }

    /// Fitted categories for a column, in code order
    pub fn classes(&self, col_name: &str) -> Option<&[String]> {
        self.mappings.get(col_name).map(|m| m.labels.as_slice())
    }

    /// Original label for a code in a column; `None` for out-of-range codes
    pub fn inverse(&self, col_name: &str, code: i64) -> Option<&str> {
        self.mappings
            .get(col_name)
            .and_then(|m| m.labels.get(usize::try_from(code).ok()?))
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train_frame() -> DataFrame {
        df!("color" => &["red", "blue", "red", "green"]).unwrap()
    }

    #[test]
    fn test_codes_are_contiguous_and_sorted() {
        let df = train_frame();
        let mut encoder = LabelEncoder::default();
        let encoded = encoder
            .fit_transform(&df, &["color".to_string()])
            .unwrap();

        // Sorted order: blue=0, green=1, red=2
        let col = encoded.column("color").unwrap().i64().unwrap();
        let codes: Vec<i64> = col.into_iter().flatten().collect();
        assert_eq!(codes, vec![2, 0, 2, 1]);
        assert_eq!(
            encoder.classes("color").unwrap(),
            &["blue".to_string(), "green".to_string(), "red".to_string()]
        );
    }

    #[test]
    fn test_transform_is_repeatable() {
        let df = train_frame();
        let mut encoder = LabelEncoder::default();
        encoder.fit(&df, &["color".to_string()]).unwrap();

        let a = encoder.transform(&df).unwrap();
        let b = encoder.transform(&df).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_unseen_category_errors_by_default() {
        let mut encoder = LabelEncoder::default();
        encoder.fit(&train_frame(), &["color".to_string()]).unwrap();

        let test = df!("color" => &["red", "purple"]).unwrap();
        let err = encoder.transform(&test).unwrap_err();
        assert!(matches!(err, PipelineError::UnseenCategory { .. }));
    }

    #[test]
    fn test_unseen_category_unknown_code() {
        let mut encoder = LabelEncoder::new(UnseenPolicy::Unknown);
        encoder.fit(&train_frame(), &["color".to_string()]).unwrap();

        let test = df!("color" => &["purple", "blue"]).unwrap();
        let encoded = encoder.transform(&test).unwrap();
        let col = encoded.column("color").unwrap().i64().unwrap();
        let codes: Vec<i64> = col.into_iter().flatten().collect();
        // Reserved code is one past the fitted range
        assert_eq!(codes, vec![3, 0]);
    }

    #[test]
    fn test_fallback_fit_on_test() {
        let mut encoder = LabelEncoder::default();
        encoder.fit(&train_frame(), &["color".to_string()]).unwrap();

        let test = df!(
            "color" => &["red"],
            "size" => &["small"]
        )
        .unwrap();
        let encoded = encoder
            .transform_with_fallback(&test, FallbackPolicy::FitOnTest)
            .unwrap();
        assert!(encoder.has_column("size"));
        let col = encoded.column("size").unwrap().i64().unwrap();
        assert_eq!(col.get(0).unwrap(), 0);
    }

    #[test]
    fn test_fallback_error() {
        let mut encoder = LabelEncoder::default();
        encoder.fit(&train_frame(), &["color".to_string()]).unwrap();

        let test = df!(
            "color" => &["red"],
            "size" => &["small"]
        )
        .unwrap();
        assert!(encoder
            .transform_with_fallback(&test, FallbackPolicy::Error)
            .is_err());
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut encoder = LabelEncoder::default();
        encoder.fit(&train_frame(), &["color".to_string()]).unwrap();

        assert_eq!(encoder.inverse("color", 0), Some("blue"));
        assert_eq!(encoder.inverse("color", 2), Some("red"));
        assert_eq!(encoder.inverse("color", 99), None);
    }
}
