//! Preprocessing stages: imputation, encoding, scaling
//!
//! Every stage is an explicit fit/transform object. Statistics live in the
//! fitted instance, so applying training-time state to test data is a method
//! call rather than a convention.

pub mod encoder;
pub mod imputer;
pub mod scaler;

pub use encoder::{FallbackPolicy, LabelEncoder, UnseenPolicy};
pub use imputer::Imputer;
pub use scaler::StandardScaler;
