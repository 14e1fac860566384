//! Feature record types for coupon acceptance prediction.
//!
//! Field names on the wire match the columns the preprocessing pipeline was
//! fitted on (including the historical `passanger` spelling).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised while building or validating a [`CouponRecord`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("value `{value}` is not allowed for field `{field}`")]
    OutOfDomain { field: String, value: String },

    #[error("field `{field}` expects a number, got `{value}`")]
    NotNumeric { field: String, value: String },

    #[error("{}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A label that does not belong to a categorical domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{value}` is not a valid {domain}")]
pub struct UnknownLabel {
    pub domain: &'static str,
    pub value: String,
}

/// Implemented by every enumerated field of the record.
pub trait Categorical: Copy + FromStr<Err = UnknownLabel> + 'static {
    /// All values in form order. The first one is the form default.
    const ALL: &'static [Self];

    /// Label exactly as the pipeline was fitted on.
    fn label(self) -> &'static str;

    /// Position of this value inside [`Categorical::ALL`].
    fn position(self) -> usize;
}

macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl Categorical for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            fn position(self) -> usize {
                Self::ALL.iter().position(|v| *v == self).unwrap_or(0)
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(UnknownLabel {
                        domain: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical!(
    /// Where the driver is heading.
    Destination {
        NoUrgentPlace => "No Urgent Place",
        Home => "Home",
        Work => "Work",
    }
);

categorical!(
    /// Who is in the car.
    Passenger {
        Alone => "Alone",
        Friends => "Friend(s)",
        Partner => "Partner",
    }
);

categorical!(
    Weather {
        Sunny => "Sunny",
        Rainy => "Rainy",
        Snowy => "Snowy",
    }
);

categorical!(
    /// Venue the coupon is valid for.
    CouponKind {
        CoffeeHouse => "Coffee House",
        CheapRestaurant => "Restaurant(<20)",
        CarryOut => "Carry out & Take away",
    }
);

categorical!(
    Expiration {
        OneDay => "1d",
        TwoHours => "2h",
    }
);

categorical!(
    Gender {
        Male => "Male",
        Female => "Female",
    }
);

categorical!(
    MaritalStatus {
        Single => "Single",
        UnmarriedPartner => "Unmarried partner",
        MarriedPartner => "Married partner",
        Divorced => "Divorced",
    }
);

categorical!(
    Education {
        SomeCollege => "Some college - no degree",
        Bachelors => "Bachelors degree",
        Associates => "Associates degree",
        HighSchoolGraduate => "High School Graduate",
        Graduate => "Graduate degree (Masters or Doctorate)",
        SomeHighSchool => "Some High School",
    }
);

categorical!(
    Occupation {
        Unemployed => "Unemployed",
        Student => "Student",
        Professional => "Professional",
        Sales => "Sales",
        Other => "Other",
    }
);

categorical!(
    /// Yearly income bracket.
    IncomeBand {
        Below12500 => "Less than $12500",
        From12500To24999 => "$12500 - $24999",
        From25000To37499 => "$25000 - $37499",
        From37500To49999 => "$37500 - $49999",
    }
);

categorical!(
    CarOwnership {
        NoCar => "None",
        OneCar => "1 car",
        TwoCars => "2 cars",
    }
);

categorical!(
    /// Monthly visit-frequency bucket.
    VisitFrequency {
        Never => "never",
        LessThanOnce => "less1",
        OneToThree => "1~3",
        FourToEight => "4~8",
        MoreThanEight => "gt8",
    }
);

/// Temperature slider bounds (°F).
pub const TEMPERATURE_RANGE: (i32, i32) = (30, 100);

/// Age slider bounds (years).
pub const AGE_RANGE: (i32, i32) = (16, 75);

/// Column names in form order.
pub const COLUMNS: [&str; 22] = [
    "destination",
    "passanger",
    "weather",
    "temperature",
    "coupon",
    "expiration",
    "gender",
    "age",
    "maritalStatus",
    "has_children",
    "education",
    "occupation",
    "income",
    "car",
    "Bar",
    "CoffeeHouse",
    "CarryAway",
    "RestaurantLessThan20",
    "Restaurant20To50",
    "toCoupon_GEQ5min",
    "toCoupon_GEQ15min",
    "toCoupon_GEQ25min",
];

/// A single cell of a raw input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Category representation: text as-is, integral numbers without a fraction.
    #[must_use]
    pub fn as_category(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Numeric representation, parsing text when possible.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_category())
    }
}

/// One model input row keyed by column name.
pub type RawRow = BTreeMap<String, RawValue>;

/// One customer/context profile: a single row of model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CouponRecord {
    pub destination: Destination,
    #[serde(rename = "passanger")]
    pub passenger: Passenger,
    pub weather: Weather,
    /// Outside temperature in °F
    pub temperature: i32,
    pub coupon: CouponKind,
    pub expiration: Expiration,
    pub gender: Gender,
    pub age: i32,
    #[serde(rename = "maritalStatus")]
    pub marital_status: MaritalStatus,
    #[serde(with = "flag")]
    pub has_children: bool,
    pub education: Education,
    pub occupation: Occupation,
    pub income: IncomeBand,
    pub car: CarOwnership,
    #[serde(rename = "Bar")]
    pub bar: VisitFrequency,
    #[serde(rename = "CoffeeHouse")]
    pub coffee_house: VisitFrequency,
    #[serde(rename = "CarryAway")]
    pub carry_away: VisitFrequency,
    #[serde(rename = "RestaurantLessThan20")]
    pub restaurant_less_than_20: VisitFrequency,
    #[serde(rename = "Restaurant20To50")]
    pub restaurant_20_to_50: VisitFrequency,
    /// Driving distance to the venue is at least 5 minutes
    #[serde(rename = "toCoupon_GEQ5min", with = "flag")]
    pub to_coupon_geq_5min: bool,
    #[serde(rename = "toCoupon_GEQ15min", with = "flag")]
    pub to_coupon_geq_15min: bool,
    #[serde(rename = "toCoupon_GEQ25min", with = "flag")]
    pub to_coupon_geq_25min: bool,
}

impl Default for CouponRecord {
    fn default() -> Self {
        Self {
            destination: Destination::NoUrgentPlace,
            passenger: Passenger::Alone,
            weather: Weather::Sunny,
            temperature: 65,
            coupon: CouponKind::CoffeeHouse,
            expiration: Expiration::OneDay,
            gender: Gender::Male,
            age: 30,
            marital_status: MaritalStatus::Single,
            has_children: false,
            education: Education::SomeCollege,
            occupation: Occupation::Unemployed,
            income: IncomeBand::Below12500,
            car: CarOwnership::NoCar,
            bar: VisitFrequency::Never,
            coffee_house: VisitFrequency::Never,
            carry_away: VisitFrequency::Never,
            restaurant_less_than_20: VisitFrequency::Never,
            restaurant_20_to_50: VisitFrequency::Never,
            to_coupon_geq_5min: false,
            to_coupon_geq_15min: false,
            to_coupon_geq_25min: false,
        }
    }
}

impl CouponRecord {
    /// Typical coffee drinker on a relaxed afternoon drive.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            destination: Destination::NoUrgentPlace,
            passenger: Passenger::Friends,
            weather: Weather::Sunny,
            temperature: 80,
            coupon: CouponKind::CoffeeHouse,
            expiration: Expiration::OneDay,
            gender: Gender::Female,
            age: 26,
            marital_status: MaritalStatus::UnmarriedPartner,
            has_children: false,
            education: Education::Bachelors,
            occupation: Occupation::Professional,
            income: IncomeBand::From37500To49999,
            car: CarOwnership::OneCar,
            bar: VisitFrequency::LessThanOnce,
            coffee_house: VisitFrequency::FourToEight,
            carry_away: VisitFrequency::OneToThree,
            restaurant_less_than_20: VisitFrequency::OneToThree,
            restaurant_20_to_50: VisitFrequency::LessThanOnce,
            to_coupon_geq_5min: true,
            to_coupon_geq_15min: false,
            to_coupon_geq_25min: false,
        }
    }

    /// Check numeric fields against the form bounds.
    ///
    /// # Errors
    /// Returns every violated bound.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let (t_min, t_max) = TEMPERATURE_RANGE;
        if !(t_min..=t_max).contains(&self.temperature) {
            errors.push(format!(
                "Temperature {} out of range [{t_min}, {t_max}]",
                self.temperature
            ));
        }
        let (a_min, a_max) = AGE_RANGE;
        if !(a_min..=a_max).contains(&self.age) {
            errors.push(format!("Age {} out of range [{a_min}, {a_max}]", self.age));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Consume the record, returning it only if it validates.
    ///
    /// # Errors
    /// Returns `RecordError::Invalid` listing every violation.
    pub fn validated(self) -> Result<Self, RecordError> {
        self.validate().map_err(RecordError::Invalid)?;
        Ok(self)
    }

    /// Parse and validate a record from its JSON form.
    ///
    /// # Errors
    /// Returns error on unknown/missing fields, out-of-domain labels or range violations.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let record: Self =
            serde_json::from_str(json).map_err(|e| RecordError::Malformed(e.to_string()))?;
        record.validated()
    }

    /// Build a record from a raw row, checking every field against its domain.
    ///
    /// # Errors
    /// Returns the first missing or out-of-domain field, or range violations.
    pub fn from_row(row: &RawRow) -> Result<Self, RecordError> {
        let record = Self {
            destination: category(row, "destination")?,
            passenger: category(row, "passanger")?,
            weather: category(row, "weather")?,
            temperature: integer(row, "temperature")?,
            coupon: category(row, "coupon")?,
            expiration: category(row, "expiration")?,
            gender: category(row, "gender")?,
            age: integer(row, "age")?,
            marital_status: category(row, "maritalStatus")?,
            has_children: binary(row, "has_children")?,
            education: category(row, "education")?,
            occupation: category(row, "occupation")?,
            income: category(row, "income")?,
            car: category(row, "car")?,
            bar: category(row, "Bar")?,
            coffee_house: category(row, "CoffeeHouse")?,
            carry_away: category(row, "CarryAway")?,
            restaurant_less_than_20: category(row, "RestaurantLessThan20")?,
            restaurant_20_to_50: category(row, "Restaurant20To50")?,
            to_coupon_geq_5min: binary(row, "toCoupon_GEQ5min")?,
            to_coupon_geq_15min: binary(row, "toCoupon_GEQ15min")?,
            to_coupon_geq_25min: binary(row, "toCoupon_GEQ25min")?,
        };
        record.validated()
    }

    /// Flatten into the row shape the preprocessing pipeline consumes.
    #[must_use]
    pub fn to_row(&self) -> RawRow {
        fn text(v: impl Categorical) -> RawValue {
            RawValue::Text(v.label().to_string())
        }
        fn number(v: i32) -> RawValue {
            RawValue::Number(f64::from(v))
        }
        fn bit(v: bool) -> RawValue {
            RawValue::Number(if v { 1.0 } else { 0.0 })
        }

        let cells = [
            text(self.destination),
            text(self.passenger),
            text(self.weather),
            number(self.temperature),
            text(self.coupon),
            text(self.expiration),
            text(self.gender),
            number(self.age),
            text(self.marital_status),
            bit(self.has_children),
            text(self.education),
            text(self.occupation),
            text(self.income),
            text(self.car),
            text(self.bar),
            text(self.coffee_house),
            text(self.carry_away),
            text(self.restaurant_less_than_20),
            text(self.restaurant_20_to_50),
            bit(self.to_coupon_geq_5min),
            bit(self.to_coupon_geq_15min),
            bit(self.to_coupon_geq_25min),
        ];

        COLUMNS
            .iter()
            .zip(cells)
            .map(|(column, value)| ((*column).to_string(), value))
            .collect()
    }
}

fn cell<'a>(row: &'a RawRow, field: &str) -> Result<&'a RawValue, RecordError> {
    row.get(field)
        .ok_or_else(|| RecordError::MissingField(field.to_string()))
}

fn category<T: Categorical>(row: &RawRow, field: &str) -> Result<T, RecordError> {
    let value = cell(row, field)?.as_category();
    value.parse().map_err(|_| RecordError::OutOfDomain {
        field: field.to_string(),
        value,
    })
}

fn integer(row: &RawRow, field: &str) -> Result<i32, RecordError> {
    let value = cell(row, field)?;
    match value.as_number() {
        Some(n) if n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX) => Ok(n as i32),
        _ => Err(RecordError::NotNumeric {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn binary(row: &RawRow, field: &str) -> Result<bool, RecordError> {
    let value = cell(row, field)?;
    match value.as_category().as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(RecordError::OutOfDomain {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Serde adapter storing booleans as the 0/1 integers the pipeline expects.
mod flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Bool(bool),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(0) | Repr::Bool(false) => Ok(false),
            Repr::Int(1) | Repr::Bool(true) => Ok(true),
            Repr::Int(other) => Err(de::Error::custom(format!("expected 0 or 1, got {other}"))),
        }
    }
}
