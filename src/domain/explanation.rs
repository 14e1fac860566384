//! Local feature-attribution results.

use serde::{Deserialize, Serialize};

/// Contiguous block of transformed dimensions produced by one source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub column: String,
    pub start: usize,
    pub len: usize,
}

impl FeatureGroup {
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Signed contribution of one feature (or one folded set of features).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub name: String,
    pub value: f64,
}

/// Attributions for a single prediction.
///
/// `base_value + values.iter().sum() ≈ output_value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Transformed feature names, one per dimension
    pub feature_names: Vec<String>,

    /// Attribution per transformed dimension
    pub values: Vec<f64>,

    /// Expected model output over the background sample
    pub base_value: f64,

    /// Model output for the explained record
    pub output_value: f64,

    /// Source column of each transformed dimension
    pub groups: Vec<FeatureGroup>,
}

impl Explanation {
    /// Difference between the model output and baseline plus attributions.
    #[must_use]
    pub fn additivity_gap(&self) -> f64 {
        self.output_value - (self.base_value + self.values.iter().sum::<f64>())
    }

    /// One contribution per transformed dimension.
    #[must_use]
    pub fn per_feature(&self) -> Vec<Contribution> {
        self.feature_names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| Contribution {
                name: name.clone(),
                value: *value,
            })
            .collect()
    }

    /// Attributions summed per source column.
    #[must_use]
    pub fn by_field(&self) -> Vec<Contribution> {
        self.groups
            .iter()
            .map(|g| Contribution {
                name: g.column.clone(),
                value: self.values[g.range()].iter().sum(),
            })
            .collect()
    }
}

/// Order by absolute contribution and keep at most `max_display` rows.
///
/// When entries are dropped, the last row is replaced by their sum so the
/// displayed values still add up to the total attribution.
#[must_use]
pub fn rank(mut contributions: Vec<Contribution>, max_display: usize) -> Vec<Contribution> {
    contributions.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));

    if max_display == 0 || contributions.len() <= max_display {
        return contributions;
    }

    let rest = contributions.split_off(max_display - 1);
    let folded: f64 = rest.iter().map(|c| c.value).sum();
    contributions.push(Contribution {
        name: format!("{} other features", rest.len()),
        value: folded,
    });
    contributions
}
