//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with model artifacts:
//! - `xgboost`: native evaluation of XGBoost JSON tree ensembles
//! - `pipeline`: fitted column transformer (encoders and scalers)
//! - `shapley`: model-agnostic Shapley value attribution
//! - `assets`: loading and cross-checking the artifact directory

pub mod assets;
pub mod pipeline;
pub mod shapley;
pub mod xgboost;

pub use assets::{AssetBundle, AssetError, AssetPaths, Fingerprints, TrustPolicy};
pub use pipeline::ColumnTransformer;
pub use shapley::{Algorithm, ExplainerSettings, ShapleyExplainer};
pub use xgboost::XgbClassifier;
