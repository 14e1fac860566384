//! Prediction result types.

use serde::{Deserialize, Serialize};

/// Threshold values that cannot be used as a decision cutoff.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold `{0}` is not a number")]
    NotNumeric(String),

    #[error("threshold {0} outside [0, 1]")]
    OutOfRange(f64),
}

/// Probability cutoff turning a score into an accept/reject decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold(f64);

impl Threshold {
    /// Create a threshold, rejecting NaN and values outside [0, 1].
    ///
    /// # Errors
    /// Returns `ThresholdError::OutOfRange` for unusable values.
    pub fn new(value: f64) -> Result<Self, ThresholdError> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(ThresholdError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Parse the contents of a threshold file (one float, whitespace ignored).
    ///
    /// # Errors
    /// Returns error for non-numeric or out-of-range content.
    pub fn parse(text: &str) -> Result<Self, ThresholdError> {
        let trimmed = text.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| ThresholdError::NotNumeric(trimmed.to_string()))?;
        Self::new(value)
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Accept only when the probability is strictly above the cutoff.
    #[must_use]
    pub fn accepts(self, probability: f64) -> bool {
        probability > self.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Whether the customer is expected to accept the coupon
    pub decision: bool,

    /// Positive-class probability (0.0 to 1.0)
    pub probability: f64,

    /// Cutoff the decision was taken against
    pub threshold: Threshold,

    pub evaluated_at: chrono::DateTime<chrono::Utc>,
}

impl Prediction {
    #[must_use]
    pub fn new(probability: f64, threshold: Threshold) -> Self {
        Self {
            decision: threshold.accepts(probability),
            probability,
            threshold,
            evaluated_at: chrono::Utc::now(),
        }
    }

    /// Short label for display.
    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.decision {
            "ACCEPT"
        } else {
            "REJECT"
        }
    }

    /// Distance from the cutoff, positive when accepted.
    #[must_use]
    pub fn margin(&self) -> f64 {
        self.probability - self.threshold.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_parse_trims_whitespace() {
        let t = Threshold::parse("  0.4783\n").expect("Should parse");
        assert!((t.value() - 0.4783).abs() < f64::EPSILON);
    }

    #[test]
    fn test_threshold_rejects_garbage() {
        assert_eq!(
            Threshold::parse("high"),
            Err(ThresholdError::NotNumeric("high".into()))
        );
        assert!(Threshold::parse("").is_err());
        assert!(matches!(
            Threshold::parse("1.5"),
            Err(ThresholdError::OutOfRange(_))
        ));
        assert!(Threshold::parse("NaN").is_err());
    }

    #[test]
    fn test_decision_is_strictly_greater() {
        let t = Threshold::new(0.5).expect("valid");
        assert!(!Prediction::new(0.5, t).decision);
        assert!(Prediction::new(0.500_001, t).decision);
        assert_eq!(Prediction::new(0.2, t).label(), "REJECT");
    }
}
