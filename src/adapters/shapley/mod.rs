//! Shapley adapter: Implementation of AttributionMethod with Shapley values.
//!
//! Attributions are interventional Shapley values: for each background row `b`
//! a coalition `S` is evaluated as `f(z)` with `z[i] = x[i]` for `i` in `S`
//! and `z[i] = b[i]` otherwise. The per-row values are averaged over the
//! background sample.
//!
//! Only features where `x` and `b` differ can receive credit, so both
//! algorithms walk the *active* set of each row.
//!
//! - [`Algorithm::Exact`] enumerates the `2^k` coalitions of the `k` active features.
//! - [`Algorithm::Permutation`] samples orderings; each one is walked forward and
//!   in reverse starting from `b`. Every walk telescopes to `f(x) - f(b)`, so
//!   `base_value + sum(values) == output_value` up to rounding.
//! - [`Algorithm::Auto`] picks exact enumeration for rows with at most
//!   `exact_max_features` active features and sampling otherwise.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::ports::{Attribution, AttributionError, AttributionMethod};

/// Coalition evaluation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    #[default]
    Auto,
    Exact,
    Permutation,
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "exact" => Ok(Self::Exact),
            "permutation" => Ok(Self::Permutation),
            other => Err(format!("unknown explain algorithm `{other}`")),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Exact => "exact",
            Self::Permutation => "permutation",
        })
    }
}

/// Explainer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainerSettings {
    pub algorithm: Algorithm,

    /// Sampled orderings per background row (each walked twice)
    pub permutations: usize,

    pub seed: u64,

    /// Largest active set enumerated exactly
    pub exact_max_features: usize,

    /// Largest background sample kept after subsampling
    pub background_limit: usize,
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Auto,
            permutations: 10,
            seed: 0,
            exact_max_features: 10,
            background_limit: 100,
        }
    }
}

/// Model-agnostic Shapley value explainer.
///
/// Holds configuration only. Each [`AttributionMethod::attribute`] call owns a
/// fresh RNG seeded from the settings.
#[derive(Debug, Clone, Default)]
pub struct ShapleyExplainer {
    settings: ExplainerSettings,
}

impl ShapleyExplainer {
    #[must_use]
    pub fn new(settings: ExplainerSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ExplainerSettings {
        &self.settings
    }

    /// Keep at most `background_limit` rows, drawn without replacement with the
    /// configured seed. Smaller samples are returned unchanged.
    #[must_use]
    pub fn subsample<T: Clone>(&self, rows: &[T]) -> Vec<T> {
        let limit = self.settings.background_limit;
        if limit == 0 || rows.len() <= limit {
            return rows.to_vec();
        }
        let mut rng = ChaCha20Rng::seed_from_u64(self.settings.seed);
        let mut picked: Vec<usize> =
            rand::seq::index::sample(&mut rng, rows.len(), limit).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| rows[i].clone()).collect()
    }

    fn exact_row(
        model: &dyn Fn(&[f64]) -> f64,
        input: &[f64],
        row: &[f64],
        active: &[usize],
        phi: &mut [f64],
    ) {
        let k = active.len();

        // Coalition values, indexed by bitmask over `active`.
        let mut values = Vec::with_capacity(1 << k);
        let mut z = row.to_vec();
        for mask in 0usize..(1 << k) {
            for (bit, &feature) in active.iter().enumerate() {
                z[feature] = if mask & (1 << bit) != 0 {
                    input[feature]
                } else {
                    row[feature]
                };
            }
            values.push(model(&z));
        }

        let weights = coalition_weights(k);
        for (bit, &feature) in active.iter().enumerate() {
            let flag = 1 << bit;
            let mut total = 0.0;
            for mask in (0usize..(1 << k)).filter(|m| m & flag == 0) {
                let size = mask.count_ones() as usize;
                total += weights[size] * (values[mask | flag] - values[mask]);
            }
            phi[feature] += total;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn permutation_row(
        &self,
        model: &dyn Fn(&[f64]) -> f64,
        input: &[f64],
        row: &[f64],
        row_output: f64,
        active: &[usize],
        rng: &mut ChaCha20Rng,
        phi: &mut [f64],
    ) {
        let walks = 2 * self.settings.permutations.max(1);
        let mut local = vec![0.0; phi.len()];
        let mut order = active.to_vec();

        for _ in 0..self.settings.permutations.max(1) {
            order.shuffle(rng);
            walk(model, input, row, row_output, order.iter(), &mut local);
            walk(model, input, row, row_output, order.iter().rev(), &mut local);
        }

        for (acc, v) in phi.iter_mut().zip(local) {
            *acc += v / walks as f64;
        }
    }
}

/// Move from `row` to `input` one feature at a time, crediting each step.
fn walk<'a>(
    model: &dyn Fn(&[f64]) -> f64,
    input: &[f64],
    row: &[f64],
    row_output: f64,
    order: impl Iterator<Item = &'a usize>,
    phi: &mut [f64],
) {
    let mut z = row.to_vec();
    let mut previous = row_output;
    for &feature in order {
        z[feature] = input[feature];
        let current = model(&z);
        phi[feature] += current - previous;
        previous = current;
    }
}

/// `s! (k - s - 1)! / k!` for every coalition size `s < k`.
fn coalition_weights(k: usize) -> Vec<f64> {
    let factorial = |n: usize| (1..=n).map(|i| i as f64).product::<f64>();
    let total = factorial(k);
    (0..k)
        .map(|s| factorial(s) * factorial(k - s - 1) / total)
        .collect()
}

fn differs(a: f64, b: f64) -> bool {
    a != b && !(a.is_nan() && b.is_nan())
}

impl AttributionMethod for ShapleyExplainer {
    fn attribute(
        &self,
        model: &dyn Fn(&[f64]) -> f64,
        input: &[f64],
        background: &[Vec<f64>],
    ) -> Result<Attribution, AttributionError> {
        if background.is_empty() {
            return Err(AttributionError::EmptyBackground);
        }
        if let Some(row) = background.iter().find(|r| r.len() != input.len()) {
            return Err(AttributionError::DimensionMismatch {
                expected: input.len(),
                got: row.len(),
            });
        }

        let limit = self.settings.exact_max_features;
        let actives: Vec<Vec<usize>> = background
            .iter()
            .map(|row| {
                (0..input.len())
                    .filter(|&i| differs(input[i], row[i]))
                    .collect()
            })
            .collect();

        if self.settings.algorithm == Algorithm::Exact {
            if let Some(widest) = actives.iter().map(Vec::len).max().filter(|&n| n > limit) {
                return Err(AttributionError::TooManyFeatures {
                    active: widest,
                    limit,
                });
            }
        }

        let mut rng = ChaCha20Rng::seed_from_u64(self.settings.seed);
        let mut phi = vec![0.0; input.len()];
        let mut base_total = 0.0;

        for (row, active) in background.iter().zip(&actives) {
            let row_output = model(row);
            base_total += row_output;
            if active.is_empty() {
                continue;
            }

            let exact = match self.settings.algorithm {
                Algorithm::Exact => true,
                Algorithm::Permutation => false,
                Algorithm::Auto => active.len() <= limit,
            };
            if exact {
                Self::exact_row(model, input, row, active, &mut phi);
            } else {
                self.permutation_row(model, input, row, row_output, active, &mut rng, &mut phi);
            }
        }

        let n = background.len() as f64;
        for v in &mut phi {
            *v /= n;
        }

        Ok(Attribution {
            values: phi,
            base_value: base_total / n,
            output_value: model(input),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(algorithm: Algorithm) -> ExplainerSettings {
        ExplainerSettings {
            algorithm,
            ..ExplainerSettings::default()
        }
    }

    fn linear(x: &[f64]) -> f64 {
        0.5 + 2.0 * x[0] - 1.0 * x[1] + 0.25 * x[2]
    }

    fn interacting(x: &[f64]) -> f64 {
        x[0] * x[1] + if x[2] > 0.5 { 0.3 } else { -0.1 } + 0.1 * x[3]
    }

    fn background() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 2.0, 0.0, 1.0],
            vec![0.5, 1.0, 1.0, 3.0],
        ]
    }

    #[test]
    fn test_linear_model_recovers_weights() {
        let bg = vec![vec![0.0, 1.0, 2.0], vec![2.0, 1.0, 0.0]];
        let x = [1.0, 3.0, 4.0];
        for algorithm in [Algorithm::Exact, Algorithm::Permutation] {
            let attr = ShapleyExplainer::new(settings(algorithm))
                .attribute(&linear, &x, &bg)
                .expect("Should explain");
            // mean background = [1, 1, 1]
            assert!((attr.values[0] - 0.0).abs() < 1e-12, "{algorithm}");
            assert!((attr.values[1] + 2.0).abs() < 1e-12, "{algorithm}");
            assert!((attr.values[2] - 0.75).abs() < 1e-12, "{algorithm}");
        }
    }

    #[test]
    fn test_additivity_holds_for_every_algorithm() {
        let x = [1.0, 1.0, 1.0, 2.0];
        for algorithm in [Algorithm::Auto, Algorithm::Exact, Algorithm::Permutation] {
            let attr = ShapleyExplainer::new(settings(algorithm))
                .attribute(&interacting, &x, &background())
                .expect("Should explain");
            let total: f64 = attr.values.iter().sum();
            assert!(
                (attr.base_value + total - attr.output_value).abs() < 1e-9,
                "{algorithm}"
            );
            assert!((attr.output_value - interacting(&x)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_exact_splits_interaction_evenly() {
        let bg = vec![vec![0.0, 0.0, 0.0, 0.0]];
        let attr = ShapleyExplainer::new(settings(Algorithm::Exact))
            .attribute(&interacting, &[2.0, 3.0, 0.0, 0.0], &bg)
            .expect("Should explain");
        assert!((attr.values[0] - 3.0).abs() < 1e-12);
        assert!((attr.values[1] - 3.0).abs() < 1e-12);
        assert_eq!(attr.values[2], 0.0);
    }

    #[test]
    fn test_permutation_is_deterministic_for_a_seed() {
        let explainer = ShapleyExplainer::new(settings(Algorithm::Permutation));
        let x = [1.0, 1.0, 1.0, 2.0];
        let a = explainer
            .attribute(&interacting, &x, &background())
            .expect("Should explain");
        let b = explainer
            .attribute(&interacting, &x, &background())
            .expect("Should explain");
        assert_eq!(a, b);
    }

    #[test]
    fn test_background_equal_to_input_gives_zeros() {
        let x = vec![0.3, 0.2, 0.9, 1.0];
        let attr = ShapleyExplainer::default()
            .attribute(&interacting, &x, &[x.clone()])
            .expect("Should explain");
        assert!(attr.values.iter().all(|v| *v == 0.0));
        assert_eq!(attr.base_value, attr.output_value);
    }

    #[test]
    fn test_rejects_bad_backgrounds() {
        let explainer = ShapleyExplainer::default();
        assert_eq!(
            explainer.attribute(&linear, &[0.0, 0.0, 0.0], &[]),
            Err(AttributionError::EmptyBackground)
        );
        assert_eq!(
            explainer.attribute(&linear, &[0.0, 0.0, 0.0], &[vec![0.0, 0.0]]),
            Err(AttributionError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_exact_refuses_wide_active_sets() {
        let explainer = ShapleyExplainer::new(ExplainerSettings {
            algorithm: Algorithm::Exact,
            exact_max_features: 2,
            ..ExplainerSettings::default()
        });
        let result = explainer.attribute(&linear, &[1.0, 1.0, 1.0], &[vec![0.0, 0.0, 0.0]]);
        assert_eq!(
            result,
            Err(AttributionError::TooManyFeatures {
                active: 3,
                limit: 2
            })
        );

        // Auto falls back to sampling instead.
        let auto = ShapleyExplainer::new(ExplainerSettings {
            exact_max_features: 2,
            ..ExplainerSettings::default()
        });
        let attr = auto
            .attribute(&linear, &[1.0, 1.0, 1.0], &[vec![0.0, 0.0, 0.0]])
            .expect("Should explain");
        assert!((attr.values[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_subsample_respects_limit_and_seed() {
        let explainer = ShapleyExplainer::new(ExplainerSettings {
            background_limit: 5,
            seed: 7,
            ..ExplainerSettings::default()
        });
        let rows: Vec<u32> = (0..50).collect();
        let picked = explainer.subsample(&rows);
        assert_eq!(picked.len(), 5);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(picked, explainer.subsample(&rows));

        let few: Vec<u32> = (0..3).collect();
        assert_eq!(explainer.subsample(&few), few);
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("Exact".parse::<Algorithm>(), Ok(Algorithm::Exact));
        assert_eq!(" permutation ".parse::<Algorithm>(), Ok(Algorithm::Permutation));
        assert!("kernel".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::default().to_string(), "auto");
    }
}
