//! Runtime configuration read from `COUPONWISE_*` environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::adapters::{Algorithm, ExplainerSettings, TrustPolicy};

pub const ASSET_DIR_ENV: &str = "COUPONWISE_ASSET_DIR";
pub const LOG_MODE_ENV: &str = "COUPONWISE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "COUPONWISE_LOG_FILE";
pub const TRUSTED_TYPES_ENV: &str = "COUPONWISE_TRUSTED_TYPES";
pub const ALGORITHM_ENV: &str = "COUPONWISE_EXPLAIN_ALGORITHM";
pub const PERMUTATIONS_ENV: &str = "COUPONWISE_EXPLAIN_PERMUTATIONS";
pub const SEED_ENV: &str = "COUPONWISE_EXPLAIN_SEED";
pub const BACKGROUND_LIMIT_ENV: &str = "COUPONWISE_BACKGROUND_LIMIT";

const DEFAULT_LOG_FILE: &str = "couponwise.log";

/// Configuration values that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: invalid value `{value}` ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise
    #[default]
    Auto,
    File,
    Stdout,
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stdout" => Ok(Self::Stdout),
            other => Err(format!("expected auto, file or stdout, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub asset_dir: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub trust: TrustPolicy,
    pub explainer: ExplainerSettings,
}

impl AppConfig {
    /// Read the process environment.
    ///
    /// # Errors
    /// Returns error if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if a set variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ExplainerSettings::default();

        let trust = match lookup(TRUSTED_TYPES_ENV) {
            Some(list) => TrustPolicy::Explicit(
                list.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            None => TrustPolicy::AllReported,
        };

        let explainer = ExplainerSettings {
            algorithm: parsed(&lookup, ALGORITHM_ENV)?.unwrap_or(defaults.algorithm),
            permutations: parsed(&lookup, PERMUTATIONS_ENV)?.unwrap_or(defaults.permutations),
            seed: parsed(&lookup, SEED_ENV)?.unwrap_or(defaults.seed),
            background_limit: parsed(&lookup, BACKGROUND_LIMIT_ENV)?
                .unwrap_or(defaults.background_limit),
            ..defaults
        };
        if explainer.permutations == 0 {
            return Err(ConfigError {
                name: PERMUTATIONS_ENV,
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            asset_dir: resolve_asset_dir(lookup(ASSET_DIR_ENV)),
            log_mode: parsed(&lookup, LOG_MODE_ENV)?.unwrap_or_default(),
            log_file: lookup(LOG_FILE_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            trust,
            explainer,
        })
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError {
                name,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

/// Explicit directory, else `assets/` next to the executable, else `./assets`.
#[must_use]
pub fn resolve_asset_dir(explicit: Option<String>) -> PathBuf {
    if let Some(dir) = explicit.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("assets")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| Path::new("assets").to_path_buf())
}
