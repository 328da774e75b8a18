//! Missing-value imputation

use crate::data::{column_kind, ColumnKind};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fill value fitted for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
enum FillValue {
    /// Arithmetic mean (numeric columns)
    Mean(f64),
    /// Most frequent value (categorical columns)
    Mode(String),
}

/// Column-wise imputer: mean for numeric columns, mode for categorical.
///
/// Fill statistics are computed from whichever frame `fit` sees; train and
/// test tables each get their own fitted instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Imputer {
    fills: HashMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute fill values for every column with at least one missing entry
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.fills.clear();

        for col in df.get_columns() {
            if col.null_count() == 0 {
                continue;
            }
            let name = col.name().to_string();
            let series = col.as_materialized_series();

            let fill = match column_kind(col) {
                ColumnKind::Categorical => FillValue::Mode(Self::mode(series, &name)?),
                ColumnKind::Numeric => {
                    let ca = series
                        .cast(&DataType::Float64)
                        .map_err(|e| PipelineError::DataError(e.to_string()))?;
                    let mean = ca
                        .f64()
                        .map_err(|e| PipelineError::DataError(e.to_string()))?
                        .mean()
                        .ok_or_else(|| {
                            PipelineError::PreprocessingError(format!(
                                "column {} has no observed values to average",
                                name
                            ))
                        })?;
                    FillValue::Mean(mean)
                }
            };
            self.fills.insert(name, fill);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace missing entries using the fitted fill values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill) in &self.fills {
            let column = match df.column(col_name) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let series = column.as_materialized_series();

            let filled: Series = match fill {
                FillValue::Mode(value) => {
                    let ca = series
                        .str()
                        .map_err(|e| PipelineError::DataError(e.to_string()))?;
                    let values: Vec<&str> = ca
                        .into_iter()
                        .map(|opt| opt.unwrap_or(value.as_str()))
                        .collect();
                    Series::new(series.name().clone(), values)
                }
                FillValue::Mean(mean) => {
                    let ca = series
                        .cast(&DataType::Float64)
                        .map_err(|e| PipelineError::DataError(e.to_string()))?;
                    let filled: Float64Chunked = ca
                        .f64()
                        .map_err(|e| PipelineError::DataError(e.to_string()))?
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(*mean)))
                        .collect();
                    filled.with_name(series.name().clone()).into_series()
                }
            };

            result = result
                .with_column(filled)
                .map_err(|e| PipelineError::DataError(e.to_string()))?
                .clone();
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Most frequent non-null value; ties broken by first occurrence
    fn mode(series: &Series, name: &str) -> Result<String> {
        let ca = series
            .str()
            .map_err(|e| PipelineError::DataError(e.to_string()))?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for value in ca.into_iter().flatten() {
            let count = counts.entry(value).or_insert(0);
            if *count == 0 {
                order.push(value);
            }
            *count += 1;
        }

        order
            .into_iter()
            .max_by_key(|v| counts[v])
            .map(|v| v.to_string())
            .ok_or_else(|| {
                PipelineError::PreprocessingError(format!(
                    "column {} has no observed values to take a mode from",
                    name
                ))
            })
    }
}
