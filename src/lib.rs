//! # Couponwise
//!
//! Coupon acceptance prediction with local feature attributions.
//!
//! This crate provides:
//! - A typed customer/context record with enumerated field domains
//! - Native evaluation of an XGBoost classifier behind a fitted preprocessing pipeline
//! - Model-agnostic Shapley attributions for every prediction
//! - Terminal UI for entering profiles and reading results
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (CouponRecord, Prediction, Explanation)
//! - `ports`: Trait definitions for the model, the pipeline and the explainer
//! - `adapters`: Concrete implementations (XGBoost JSON, column transformer, Shapley)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{CouponRecord, Explanation, Prediction};

/// Result type for Couponwise operations
pub type Result<T> = std::result::Result<T, CouponError>;

/// Main error type for Couponwise
#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("Asset loading failed: {0}")]
    Asset(#[from] adapters::AssetError),

    #[error("Invalid record: {0}")]
    Record(#[from] domain::RecordError),

    #[error("Preprocessing failed: {0}")]
    Transform(#[from] ports::TransformError),

    #[error("Model evaluation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Explanation failed: {0}")]
    Attribution(#[from] ports::AttributionError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
