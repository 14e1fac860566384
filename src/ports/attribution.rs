//! Attribution port: Trait for model-agnostic local explanations.

/// Errors that can occur while computing attributions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributionError {
    #[error("Background sample is empty")]
    EmptyBackground,

    #[error("Background row has {got} features, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Exact attribution over {active} varying features exceeds the limit of {limit}")]
    TooManyFeatures { active: usize, limit: usize },
}

/// Raw attribution output for one input vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// One value per input dimension
    pub values: Vec<f64>,

    /// Mean model output over the background rows
    pub base_value: f64,

    /// Model output for the explained input
    pub output_value: f64,
}

/// Trait for attribution methods that only need black-box access to the model.
///
/// Implementations must not keep state between calls: two calls with the same
/// arguments return the same attribution.
pub trait AttributionMethod: Send + Sync {
    /// Explain `model(input)` against the `background` rows.
    ///
    /// # Errors
    /// Returns error for an empty background, mismatched dimensions, or an
    /// input the method cannot handle.
    fn attribute(
        &self,
        model: &dyn Fn(&[f64]) -> f64,
        input: &[f64],
        background: &[Vec<f64>],
    ) -> Result<Attribution, AttributionError>;
}
