//! Explanation service: attributes one prediction to the transformed features.
//!
//! The background sample is transformed once at construction. Without a
//! background sample the explained record is its own reference, which makes
//! every attribution zero.

use std::sync::Arc;

use crate::domain::{CouponRecord, Explanation, RecordError};
use crate::ports::{AttributionMethod, Classifier, Preprocessor};
use crate::Result;

/// Service for explaining single predictions.
pub struct ExplanationService<C, P, A>
where
    C: Classifier,
    P: Preprocessor,
    A: AttributionMethod,
{
    classifier: Arc<C>,
    preprocessor: Arc<P>,
    method: A,
    background: Vec<Vec<f64>>,
}

impl<C, P, A> ExplanationService<C, P, A>
where
    C: Classifier,
    P: Preprocessor,
    A: AttributionMethod,
{
    /// Create a new explanation service.
    ///
    /// # Errors
    /// Returns error if a background record cannot be transformed.
    pub fn new(
        classifier: Arc<C>,
        preprocessor: Arc<P>,
        method: A,
        background: &[CouponRecord],
    ) -> Result<Self> {
        let background = background
            .iter()
            .map(|record| preprocessor.transform(&record.to_row()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if background.is_empty() {
            tracing::warn!("Explainer has no background sample; attributions will be zero");
        } else {
            tracing::info!(rows = background.len(), "Explainer background prepared");
        }

        Ok(Self {
            classifier,
            preprocessor,
            method,
            background,
        })
    }

    #[must_use]
    pub fn background_rows(&self) -> usize {
        self.background.len()
    }

    /// Attribute the classifier's probability for `record`.
    ///
    /// # Errors
    /// Returns error if the record is invalid or the attribution method fails.
    pub fn explain(&self, record: &CouponRecord) -> Result<Explanation> {
        record.validate().map_err(RecordError::Invalid)?;

        let features = self.preprocessor.transform(&record.to_row())?;
        self.classifier.checked_proba(&features)?;

        let own_reference;
        let background: &[Vec<f64>] = if self.background.is_empty() {
            own_reference = vec![features.clone()];
            &own_reference
        } else {
            &self.background
        };

        let classifier = &self.classifier;
        let model = |z: &[f64]| classifier.predict_proba(z);
        let attribution = self.method.attribute(&model, &features, background)?;

        let explanation = Explanation {
            feature_names: self.preprocessor.output_names().to_vec(),
            values: attribution.values,
            base_value: attribution.base_value,
            output_value: attribution.output_value,
            groups: self.preprocessor.output_groups().to_vec(),
        };

        tracing::debug!(
            base_value = explanation.base_value,
            output_value = explanation.output_value,
            additivity_gap = explanation.additivity_gap(),
            "Explanation complete"
        );

        Ok(explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        Algorithm, AssetBundle, AssetPaths, ColumnTransformer, ExplainerSettings,
        ShapleyExplainer, TrustPolicy, XgbClassifier,
    };
    use crate::domain::record::{CouponKind, Expiration, VisitFrequency};

    type Service = ExplanationService<XgbClassifier, ColumnTransformer, ShapleyExplainer>;

    fn bundle() -> AssetBundle {
        let paths = AssetPaths::in_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"));
        AssetBundle::load(&paths, &TrustPolicy::default()).expect("Should load assets")
    }

    fn service(settings: ExplainerSettings, with_background: bool) -> Service {
        let bundle = bundle();
        let explainer = ShapleyExplainer::new(settings);
        let background = if with_background {
            explainer.subsample(&bundle.background)
        } else {
            Vec::new()
        };
        ExplanationService::new(bundle.classifier, bundle.preprocessor, explainer, &background)
            .expect("Should build service")
    }

    fn high_propensity() -> CouponRecord {
        CouponRecord {
            coupon: CouponKind::CoffeeHouse,
            expiration: Expiration::OneDay,
            bar: VisitFrequency::MoreThanEight,
            coffee_house: VisitFrequency::MoreThanEight,
            to_coupon_geq_5min: true,
            ..CouponRecord::default()
        }
    }

    #[test]
    fn test_one_attribution_per_dimension_and_additive() {
        let service = service(ExplainerSettings::default(), true);
        let explanation = service.explain(&high_propensity()).expect("Should explain");

        assert_eq!(explanation.values.len(), 49);
        assert_eq!(explanation.feature_names.len(), 49);
        assert!(explanation.additivity_gap().abs() < 1e-9);
        assert!((explanation.output_value - 0.777_299_861_174_691_1).abs() < 1e-6);
    }

    #[test]
    fn test_only_model_inputs_receive_credit() {
        let service = service(ExplainerSettings::default(), true);
        let explanation = service.explain(&high_propensity()).expect("Should explain");

        // The shipped trees split on these fields only.
        let used = ["coupon", "expiration", "Bar", "CoffeeHouse", "toCoupon_GEQ15min"];
        for field in explanation.by_field() {
            if !used.contains(&field.name.as_str()) {
                assert_eq!(field.value, 0.0, "{}", field.name);
            }
        }
        let coffee = explanation
            .by_field()
            .into_iter()
            .find(|c| c.name == "CoffeeHouse")
            .expect("CoffeeHouse field");
        assert!(coffee.value > 0.0);
    }

    #[test]
    fn test_explain_is_repeatable() {
        let service = service(
            ExplainerSettings {
                algorithm: Algorithm::Permutation,
                ..ExplainerSettings::default()
            },
            true,
        );
        let a = service.explain(&CouponRecord::sample()).expect("first");
        let b = service.explain(&CouponRecord::sample()).expect("second");
        assert_eq!(a.values, b.values);
        assert_eq!(a.base_value, b.base_value);
    }

    #[test]
    fn test_without_background_attributions_are_zero() {
        let service = service(ExplainerSettings::default(), false);
        assert_eq!(service.background_rows(), 0);

        let explanation = service.explain(&high_propensity()).expect("Should explain");
        assert!(explanation.values.iter().all(|v| *v == 0.0));
        assert_eq!(explanation.base_value, explanation.output_value);
    }
}
