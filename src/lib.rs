//! Tabular classification pipeline: CSV in, scored models and a submission
//! file out.
//!
//! The stages mirror a standard supervised workflow: load train/test tables,
//! impute missing values, label-encode categoricals (fit on train), hold out
//! a stratified validation split, standardize features, fit four classifier
//! families, grid-search the random forest with cross-validation, then
//! predict the test table and write `submission.csv`.
//!
//! ```no_run
//! use tabpipe::pipeline::{run, PipelineConfig};
//!
//! let report = run(&PipelineConfig::default())?;
//! println!("{}", report.render());
//! # Ok::<(), tabpipe::error::PipelineError>(())
//! ```

pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod search;
pub mod split;
pub mod submission;

pub use error::{PipelineError, Result};
pub use models::{Classifier, ClassifierKind};
pub use pipeline::{run, PipelineConfig, PipelineReport};
