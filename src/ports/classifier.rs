//! Classifier port: Trait for binary probability models.
//!
//! This trait abstracts the model format (XGBoost JSON) from the application logic.

/// Errors that can occur while evaluating a classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Trait for immutable, previously trained binary classifiers.
///
/// Implementations must be safe to share read-only across threads.
pub trait Classifier: Send + Sync {
    /// Number of input dimensions the model was trained on.
    fn n_features(&self) -> usize;

    /// Positive-class probability for one numeric feature vector.
    ///
    /// The caller guarantees `features.len() == self.n_features()`; see
    /// [`Classifier::checked_proba`] for the validating variant.
    fn predict_proba(&self, features: &[f64]) -> f64;

    /// Positive-class probability after checking the input dimensionality.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if the vector has the wrong length.
    fn checked_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                got: features.len(),
            });
        }
        Ok(self.predict_proba(features))
    }
}
