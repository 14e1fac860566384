//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the model, pipeline and explainer formats.

mod attribution;
mod classifier;
mod preprocessor;

pub use attribution::{Attribution, AttributionError, AttributionMethod};
pub use classifier::{Classifier, ModelError};
pub use preprocessor::{Preprocessor, TransformError};
