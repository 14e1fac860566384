//! Asset loading: classifier, preprocessing pipeline, threshold and background sample.
//!
//! All artifacts live in one directory. Loading is all-or-nothing: any missing
//! or malformed artifact aborts with an [`AssetError`]. The background sample
//! is the only optional file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::pipeline::{self, ColumnTransformer, PipelineError};
use super::xgboost::{XgbClassifier, XgbError};
use crate::domain::record::COLUMNS;
use crate::domain::{CouponRecord, Threshold, ThresholdError};
use crate::ports::{Classifier, Preprocessor};

pub const MODEL_FILE: &str = "xgb_coupon_model.json";
pub const PIPELINE_FILE: &str = "xgb_coupon_preprocessor.json";
pub const THRESHOLD_FILE: &str = "threshold.txt";
pub const BACKGROUND_FILE: &str = "background.json";

/// Errors that can occur while loading assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid model {path:?}: {source}")]
    Model { path: PathBuf, source: XgbError },

    #[error("Invalid pipeline {path:?}: {source}")]
    Pipeline {
        path: PathBuf,
        source: PipelineError,
    },

    #[error("Pipeline uses untrusted step types: {}", .0.join(", "))]
    UntrustedType(Vec<String>),

    #[error("Invalid threshold {path:?}: {source}")]
    Threshold {
        path: PathBuf,
        source: ThresholdError,
    },

    #[error("Pipeline produces {pipeline} features, model expects {model}")]
    DimensionMismatch { pipeline: usize, model: usize },

    #[error("Pipeline consumes column `{0}`, which is not a record field")]
    UnknownColumn(String),

    #[error("Invalid background sample {path:?}: {reason}")]
    Background { path: PathBuf, reason: String },
}

/// Locations of the artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub model: PathBuf,
    pub pipeline: PathBuf,
    pub threshold: PathBuf,
    pub background: PathBuf,
}

impl AssetPaths {
    /// Default file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            pipeline: dir.join(PIPELINE_FILE),
            threshold: dir.join(THRESHOLD_FILE),
            background: dir.join(BACKGROUND_FILE),
        }
    }
}

/// Which pipeline step types may be deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Trust every type the artifact reports.
    #[default]
    AllReported,

    /// Trust only the listed types (in addition to the built-in defaults).
    Explicit(Vec<String>),
}

impl TrustPolicy {
    /// Check the reported untrusted types against the policy.
    ///
    /// # Errors
    /// Returns `AssetError::UntrustedType` listing every type not covered.
    pub fn check(&self, reported: &[String]) -> Result<(), AssetError> {
        match self {
            Self::AllReported => Ok(()),
            Self::Explicit(allowed) => {
                let rejected: Vec<String> = reported
                    .iter()
                    .filter(|t| !allowed.contains(t))
                    .cloned()
                    .collect();
                if rejected.is_empty() {
                    Ok(())
                } else {
                    Err(AssetError::UntrustedType(rejected))
                }
            }
        }
    }
}

/// Step types in the pipeline artifact at `path` that are not trusted by default.
///
/// # Errors
/// Returns error if the file cannot be read or is not a pipeline artifact.
pub fn untrusted_types(path: &Path) -> Result<Vec<String>, AssetError> {
    let content = read(path)?;
    pipeline::untrusted_types(&content).map_err(|source| AssetError::Pipeline {
        path: path.to_path_buf(),
        source,
    })
}

/// SHA-256 digests (lowercase hex) of the loaded files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprints {
    pub model: String,
    pub pipeline: String,
    pub threshold: String,
    pub background: Option<String>,
}

/// Everything needed to predict and explain, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    pub classifier: Arc<XgbClassifier>,
    pub preprocessor: Arc<ColumnTransformer>,
    pub threshold: Threshold,

    /// Reference records for attribution; empty when no sample is shipped
    pub background: Vec<CouponRecord>,

    pub fingerprints: Fingerprints,
    pub paths: AssetPaths,
}

impl AssetBundle {
    /// Load and cross-check all artifacts.
    ///
    /// # Errors
    /// Returns error for missing files, malformed content, untrusted pipeline
    /// steps or a pipeline/model dimension mismatch.
    pub fn load(paths: &AssetPaths, trust: &TrustPolicy) -> Result<Self, AssetError> {
        // Model
        let model_bytes = read(&paths.model)?;
        let classifier =
            XgbClassifier::from_json(&model_bytes).map_err(|source| AssetError::Model {
                path: paths.model.clone(),
                source,
            })?;

        // Pipeline: trust check before typed deserialization
        let pipeline_bytes = read(&paths.pipeline)?;
        let pipeline_error = |source| AssetError::Pipeline {
            path: paths.pipeline.clone(),
            source,
        };
        let reported = pipeline::untrusted_types(&pipeline_bytes).map_err(pipeline_error)?;
        if !reported.is_empty() {
            tracing::warn!(types = ?reported, "Pipeline reports non-default step types");
        }
        trust.check(&reported)?;
        let preprocessor = ColumnTransformer::from_json(&pipeline_bytes).map_err(pipeline_error)?;

        if let Some(column) = preprocessor
            .input_columns()
            .into_iter()
            .find(|c| !COLUMNS.contains(c))
        {
            return Err(AssetError::UnknownColumn(column.to_string()));
        }
        if preprocessor.output_dim() != classifier.n_features() {
            return Err(AssetError::DimensionMismatch {
                pipeline: preprocessor.output_dim(),
                model: classifier.n_features(),
            });
        }
        if !classifier.feature_names().is_empty()
            && classifier.feature_names() != preprocessor.output_names()
        {
            tracing::warn!("Model feature names differ from pipeline output names");
        }

        // Threshold
        let threshold_bytes = read(&paths.threshold)?;
        let threshold_error = |source| AssetError::Threshold {
            path: paths.threshold.clone(),
            source,
        };
        let text = std::str::from_utf8(&threshold_bytes)
            .map_err(|_| threshold_error(ThresholdError::NotNumeric("<binary>".into())))?;
        let threshold = Threshold::parse(text).map_err(threshold_error)?;

        // Background (optional)
        let (background, background_hash) = if paths.background.exists() {
            let bytes = read(&paths.background)?;
            let records = parse_background(&paths.background, &bytes)?;
            (records, Some(sha256_hex(&bytes)))
        } else {
            tracing::warn!(
                "No background sample at {:?}; attributions will use the explained record as reference",
                paths.background
            );
            (Vec::new(), None)
        };

        let fingerprints = Fingerprints {
            model: sha256_hex(&model_bytes),
            pipeline: sha256_hex(&pipeline_bytes),
            threshold: sha256_hex(&threshold_bytes),
            background: background_hash,
        };

        let writer = classifier.writer_version();
        tracing::info!(
            n_trees = classifier.n_trees(),
            n_nodes = classifier.n_nodes(),
            n_features = classifier.n_features(),
            xgboost = writer.as_deref().unwrap_or("unknown"),
            steps = ?preprocessor.step_summary(),
            threshold = threshold.value(),
            background_rows = background.len(),
            model_sha256 = %fingerprints.model,
            pipeline_sha256 = %fingerprints.pipeline,
            "Loaded assets"
        );

        Ok(Self {
            classifier: Arc::new(classifier),
            preprocessor: Arc::new(preprocessor),
            threshold,
            background,
            fingerprints,
            paths: paths.clone(),
        })
    }
}

fn read(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_background(path: &Path, bytes: &[u8]) -> Result<Vec<CouponRecord>, AssetError> {
    let invalid = |reason: String| AssetError::Background {
        path: path.to_path_buf(),
        reason,
    };
    let records: Vec<CouponRecord> =
        serde_json::from_slice(bytes).map_err(|e| invalid(e.to_string()))?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.validated().map_err(|e| invalid(format!("row {i}: {e}"))))
        .collect()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
