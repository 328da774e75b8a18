//! Dataset loading and matrix extraction

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;

/// Column data type as seen by the preprocessing stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Load a CSV file into a DataFrame with schema inference
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))?
        .finish()
        .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))?;
    Ok(df)
}

/// Classify a column as numeric or categorical from its dtype
pub fn column_kind(col: &Column) -> ColumnKind {
    match col.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => ColumnKind::Numeric,
        _ => ColumnKind::Categorical,
    }
}

/// Names of all categorical (non-numeric) columns in the frame
pub fn categorical_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| column_kind(c) == ColumnKind::Categorical)
        .map(|c| c.name().to_string())
        .collect()
}

/// Extract named columns into a row-major `Array2<f64>`.
/// Collects each column contiguously first, then builds the row-major
/// array via `from_shape_fn` (cache-friendly for column-major Polars data).
pub fn columns_to_matrix(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| PipelineError::ColumnNotFound(col_name.clone()))?;
            let series_f64 = series
                .cast(&DataType::Float64)
                .map_err(|e| PipelineError::DataError(e.to_string()))?;
            let values: Vec<f64> = series_f64
                .f64()
                .map_err(|e| PipelineError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Extract a single column as an `Array1<f64>`
pub fn column_to_vector(df: &DataFrame, col_name: &str) -> Result<Array1<f64>> {
    let series = df
        .column(col_name)
        .map_err(|_| PipelineError::ColumnNotFound(col_name.to_string()))?;
    let series_f64 = series
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::DataError(e.to_string()))?;
    let values: Vec<f64> = series_f64
        .f64()
        .map_err(|e| PipelineError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(Array1::from_vec(values))
}

/// Feature column names: everything except the target
pub fn feature_columns(df: &DataFrame, target: &str) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != target)
        .map(|s| s.to_string())
        .collect()
}
