//! Preprocessor port: Trait for fitted feature pipelines.
//!
//! This trait abstracts the pipeline artifact format from the application logic.

use crate::domain::{FeatureGroup, RawRow};

/// Errors surfaced by a pipeline's transform step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("missing column `{0}`")]
    MissingColumn(String),

    #[error("found unknown category `{value}` in column `{column}`")]
    UnknownCategory { column: String, value: String },

    #[error("column `{column}` expects a number, got `{value}`")]
    NotNumeric { column: String, value: String },
}

/// Trait for immutable, previously fitted preprocessing pipelines.
pub trait Preprocessor: Send + Sync {
    /// Columns the pipeline was fitted on.
    fn input_columns(&self) -> Vec<&str>;

    /// Name of every output dimension, in output order.
    fn output_names(&self) -> &[String];

    /// Output dimensions produced by each input column.
    fn output_groups(&self) -> &[FeatureGroup];

    /// Number of output dimensions.
    fn output_dim(&self) -> usize {
        self.output_names().len()
    }

    /// Map one raw row into a numeric feature vector.
    ///
    /// # Errors
    /// Returns error for missing columns, unknown categories or non-numeric values.
    fn transform(&self, row: &RawRow) -> Result<Vec<f64>, TransformError>;
}
