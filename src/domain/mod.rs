//! Domain layer: Core business types and logic.
//!
//! Pure Rust types with strict validation and serde support.

mod explanation;
mod prediction;
pub mod record;

pub use explanation::{rank, Contribution, Explanation, FeatureGroup};
pub use prediction::{Prediction, Threshold, ThresholdError};
pub use record::{Categorical, CouponRecord, RawRow, RawValue, RecordError};
