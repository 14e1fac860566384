//! Prediction service: record -> pipeline -> classifier -> thresholded decision.

use std::sync::Arc;

use crate::domain::{CouponRecord, Prediction, RecordError, Threshold};
use crate::ports::{Classifier, Preprocessor};
use crate::Result;

/// Service for scoring single records.
pub struct PredictionService<C, P>
where
    C: Classifier,
    P: Preprocessor,
{
    classifier: Arc<C>,
    preprocessor: Arc<P>,
    threshold: Threshold,
}

impl<C, P> PredictionService<C, P>
where
    C: Classifier,
    P: Preprocessor,
{
    /// Create a new prediction service.
    pub fn new(classifier: Arc<C>, preprocessor: Arc<P>, threshold: Threshold) -> Self {
        Self {
            classifier,
            preprocessor,
            threshold,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Score one record.
    ///
    /// # Errors
    /// Returns error if the record is out of range or the pipeline rejects it.
    pub fn predict(&self, record: &CouponRecord) -> Result<Prediction> {
        record.validate().map_err(RecordError::Invalid)?;

        let features = self.preprocessor.transform(&record.to_row())?;
        let probability = self.classifier.checked_proba(&features)?;
        let prediction = Prediction::new(probability, self.threshold);

        tracing::info!(
            coupon = %record.coupon,
            probability = prediction.probability,
            decision = prediction.label(),
            "Prediction complete"
        );

        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use proptest::prelude::*;

    use crate::adapters::{AssetBundle, AssetPaths, ColumnTransformer, TrustPolicy, XgbClassifier};
    use crate::domain::record::{
        CarOwnership, CouponKind, Destination, Education, Expiration, Gender, IncomeBand,
        MaritalStatus, Occupation, Passenger, VisitFrequency, Weather, AGE_RANGE,
        TEMPERATURE_RANGE,
    };
    use crate::domain::Categorical;
    use crate::CouponError;

    type Service = PredictionService<XgbClassifier, ColumnTransformer>;

    fn service() -> Service {
        let paths = AssetPaths::in_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"));
        let bundle = AssetBundle::load(&paths, &TrustPolicy::default()).expect("Should load assets");
        PredictionService::new(bundle.classifier, bundle.preprocessor, bundle.threshold)
    }

    fn shared() -> &'static Service {
        static SERVICE: OnceLock<Service> = OnceLock::new();
        SERVICE.get_or_init(service)
    }

    /// Every visit frequency at the top bucket, everything else default.
    fn all_gt8() -> CouponRecord {
        CouponRecord {
            bar: VisitFrequency::MoreThanEight,
            coffee_house: VisitFrequency::MoreThanEight,
            carry_away: VisitFrequency::MoreThanEight,
            restaurant_less_than_20: VisitFrequency::MoreThanEight,
            restaurant_20_to_50: VisitFrequency::MoreThanEight,
            ..CouponRecord::default()
        }
    }

    fn two_hour_far_venue() -> CouponRecord {
        CouponRecord {
            coupon: CouponKind::CoffeeHouse,
            expiration: Expiration::TwoHours,
            to_coupon_geq_5min: true,
            to_coupon_geq_15min: true,
            ..CouponRecord::default()
        }
    }

    #[test]
    fn test_regression_all_never_accepts() {
        let prediction = service().predict(&CouponRecord::default()).expect("Should predict");
        assert!((prediction.probability - 0.487_502_603_515_789_6).abs() < 1e-6);
        assert!(prediction.decision);
        assert_eq!(prediction.label(), "ACCEPT");
    }

    #[test]
    fn test_regression_all_gt8_accepts() {
        let prediction = service().predict(&all_gt8()).expect("Should predict");
        assert!((prediction.probability - 0.777_299_861_174_691_1).abs() < 1e-6);
        assert!(prediction.decision);
        assert_eq!(prediction.label(), "ACCEPT");
    }

    #[test]
    fn test_regression_two_hour_far_venue_rejects() {
        let prediction = service().predict(&two_hour_far_venue()).expect("Should predict");
        assert!((prediction.probability - 0.278_884_821_977_136_9).abs() < 1e-6);
        assert!(!prediction.decision);
        assert_eq!(prediction.label(), "REJECT");
    }

    #[test]
    fn test_reloaded_assets_predict_identically() {
        let first = service();
        let second = service();
        let records = [
            CouponRecord::default(),
            CouponRecord::sample(),
            all_gt8(),
            two_hour_far_venue(),
        ];
        for record in &records {
            let a = first.predict(record).expect("first load");
            let b = second.predict(record).expect("second load");
            assert_eq!(
                (a.decision, a.probability),
                (b.decision, b.probability),
                "{record:?}"
            );
        }
    }

    #[test]
    fn test_predict_is_deterministic() {
        let service = service();
        let a = service.predict(&CouponRecord::sample()).expect("first");
        let b = service.predict(&CouponRecord::sample()).expect("second");
        assert_eq!(a.probability, b.probability);
        assert_eq!(a.decision, b.decision);
    }

    #[test]
    fn test_out_of_range_record_is_rejected() {
        let record = CouponRecord {
            age: 12,
            ..CouponRecord::default()
        };
        let err = service().predict(&record).unwrap_err();
        assert!(matches!(err, CouponError::Record(RecordError::Invalid(_))));
    }

    fn pick<T: Categorical + std::fmt::Debug>() -> impl Strategy<Value = T> {
        prop::sample::select(T::ALL)
    }

    prop_compose! {
        fn coupon_record()(
            (destination, passenger, weather, coupon, expiration, gender) in (
                pick::<Destination>(),
                pick::<Passenger>(),
                pick::<Weather>(),
                pick::<CouponKind>(),
                pick::<Expiration>(),
                pick::<Gender>(),
            ),
            (marital_status, education, occupation, income, car) in (
                pick::<MaritalStatus>(),
                pick::<Education>(),
                pick::<Occupation>(),
                pick::<IncomeBand>(),
                pick::<CarOwnership>(),
            ),
            visits in prop::array::uniform5(pick::<VisitFrequency>()),
            temperature in TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1,
            age in AGE_RANGE.0..=AGE_RANGE.1,
            flags in any::<[bool; 4]>(),
        ) -> CouponRecord {
            CouponRecord {
                destination,
                passenger,
                weather,
                temperature,
                coupon,
                expiration,
                gender,
                age,
                marital_status,
                has_children: flags[0],
                education,
                occupation,
                income,
                car,
                bar: visits[0],
                coffee_house: visits[1],
                carry_away: visits[2],
                restaurant_less_than_20: visits[3],
                restaurant_20_to_50: visits[4],
                to_coupon_geq_5min: flags[1],
                to_coupon_geq_15min: flags[2],
                to_coupon_geq_25min: flags[3],
            }
        }
    }

    proptest! {
        #[test]
        fn decision_is_probability_above_threshold(record in coupon_record()) {
            let service = shared();
            let prediction = service.predict(&record).expect("valid record");
            prop_assert!((0.0..=1.0).contains(&prediction.probability));
            prop_assert_eq!(
                prediction.decision,
                prediction.probability > service.threshold().value()
            );
        }
    }
}
