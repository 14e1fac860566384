//! Pipeline adapter: Implementation of Preprocessor for fitted column transformers.
//!
//! The artifact is a JSON export of a fitted column transformer: an ordered list
//! of steps, each applying one encoder or scaler to a list of columns. Output
//! dimensions are the concatenation of every step's output in step order, and
//! are named the way scikit-learn's `get_feature_names_out()` names them
//! (`step__column` or `step__column_category`).
//!
//! # Trust
//!
//! Every step carries a `type` tag. [`untrusted_types`] lists the tags that are
//! not on [`DEFAULT_TRUSTED_TYPES`] so the loader can decide whether to accept
//! them before any typed deserialization happens.

use std::collections::HashSet;

use serde::Deserialize;

use crate::domain::{FeatureGroup, RawRow, RawValue};
use crate::ports::{Preprocessor, TransformError};

/// Artifact format understood by this adapter.
pub const FORMAT_VERSION: u32 = 1;

/// Step types accepted without an explicit trust decision.
pub const DEFAULT_TRUSTED_TYPES: [&str; 4] = [
    "one_hot_encoder",
    "ordinal_encoder",
    "standard_scaler",
    "passthrough",
];

/// Errors raised while reading a pipeline artifact.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid pipeline JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed pipeline: {0}")]
    Malformed(String),

    #[error("Unsupported pipeline format version {0}")]
    UnsupportedVersion(u32),

    #[error("Step `{step}`: {reason}")]
    InvalidStep { step: String, reason: String },

    #[error("Column `{0}` is consumed by more than one step")]
    DuplicateColumn(String),
}

#[derive(Debug, Deserialize)]
struct PipelineDocument {
    format_version: u32,
    steps: Vec<StepDocument>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StepDocument {
    OneHotEncoder {
        name: String,
        columns: Vec<String>,
        categories: Vec<Vec<String>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    OrdinalEncoder {
        name: String,
        columns: Vec<String>,
        categories: Vec<Vec<String>>,
    },
    StandardScaler {
        name: String,
        columns: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    MinMaxScaler {
        name: String,
        columns: Vec<String>,
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "unit_range")]
        feature_range: [f64; 2],
    },
    Passthrough {
        name: String,
        columns: Vec<String>,
    },
}

fn unit_range() -> [f64; 2] {
    [0.0, 1.0]
}

#[derive(Debug, Clone)]
enum Encoding {
    OneHot {
        categories: Vec<Vec<String>>,
        ignore_unknown: bool,
    },
    Ordinal {
        categories: Vec<Vec<String>>,
    },
    /// `(x - shift) * factor + offset`, per column
    Affine {
        shift: Vec<f64>,
        factor: Vec<f64>,
        offset: Vec<f64>,
    },
    Passthrough,
}

#[derive(Debug, Clone)]
struct Step {
    name: String,
    kind: &'static str,
    columns: Vec<String>,
    encoding: Encoding,
}

impl Step {
    fn from_document(doc: StepDocument) -> Result<Self, PipelineError> {
        let (name, kind, columns, encoding) = match doc {
            StepDocument::OneHotEncoder {
                name,
                columns,
                categories,
                handle_unknown,
            } => {
                let encoding = Encoding::OneHot {
                    categories,
                    ignore_unknown: handle_unknown == HandleUnknown::Ignore,
                };
                (name, "one_hot_encoder", columns, encoding)
            }
            StepDocument::OrdinalEncoder {
                name,
                columns,
                categories,
            } => (name, "ordinal_encoder", columns, Encoding::Ordinal { categories }),
            StepDocument::StandardScaler {
                name,
                columns,
                mean,
                scale,
            } => {
                // Zero-variance columns are left unscaled.
                let factor = scale
                    .iter()
                    .map(|&s| if s == 0.0 { 1.0 } else { 1.0 / s })
                    .collect();
                let offset = vec![0.0; mean.len()];
                let encoding = Encoding::Affine {
                    shift: mean,
                    factor,
                    offset,
                };
                (name, "standard_scaler", columns, encoding)
            }
            StepDocument::MinMaxScaler {
                name,
                columns,
                data_min,
                data_max,
                feature_range: [low, high],
            } => {
                if data_min.len() != data_max.len() {
                    return Err(PipelineError::InvalidStep {
                        step: name,
                        reason: "data_min and data_max differ in length".into(),
                    });
                }
                let factor = data_min
                    .iter()
                    .zip(&data_max)
                    .map(|(lo, hi)| {
                        let range = hi - lo;
                        (high - low) / if range == 0.0 { 1.0 } else { range }
                    })
                    .collect();
                let offset = vec![low; data_min.len()];
                let encoding = Encoding::Affine {
                    shift: data_min,
                    factor,
                    offset,
                };
                (name, "min_max_scaler", columns, encoding)
            }
            StepDocument::Passthrough { name, columns } => {
                (name, "passthrough", columns, Encoding::Passthrough)
            }
        };

        let step = Self {
            name,
            kind,
            columns,
            encoding,
        };
        step.check_shapes()?;
        Ok(step)
    }

    fn check_shapes(&self) -> Result<(), PipelineError> {
        let invalid = |reason: String| PipelineError::InvalidStep {
            step: self.name.clone(),
            reason,
        };

        if self.columns.is_empty() {
            return Err(invalid("no columns".into()));
        }
        let n = self.columns.len();

        match &self.encoding {
            Encoding::OneHot { categories, .. } | Encoding::Ordinal { categories } => {
                if categories.len() != n {
                    return Err(invalid(format!(
                        "{} category lists for {n} columns",
                        categories.len()
                    )));
                }
                for (column, cats) in self.columns.iter().zip(categories) {
                    if cats.is_empty() {
                        return Err(invalid(format!("column `{column}` has no categories")));
                    }
                    let unique: HashSet<&String> = cats.iter().collect();
                    if unique.len() != cats.len() {
                        return Err(invalid(format!(
                            "column `{column}` lists a category twice"
                        )));
                    }
                }
            }
            Encoding::Affine {
                shift,
                factor,
                offset,
            } => {
                if shift.len() != n || factor.len() != n || offset.len() != n {
                    return Err(invalid(format!(
                        "scaler parameters do not match {n} columns"
                    )));
                }
                if shift.iter().chain(factor).any(|v| !v.is_finite()) {
                    return Err(invalid("scaler parameters must be finite".into()));
                }
            }
            Encoding::Passthrough => {}
        }
        Ok(())
    }

    /// Output width contributed by the `i`-th column of this step.
    fn width(&self, i: usize) -> usize {
        match &self.encoding {
            Encoding::OneHot { categories, .. } => categories[i].len(),
            _ => 1,
        }
    }

    fn output_names(&self, i: usize) -> Vec<String> {
        let column = &self.columns[i];
        match &self.encoding {
            Encoding::OneHot { categories, .. } => categories[i]
                .iter()
                .map(|cat| format!("{}__{}_{}", self.name, column, cat))
                .collect(),
            _ => vec![format!("{}__{}", self.name, column)],
        }
    }

    fn encode(&self, i: usize, value: &RawValue, out: &mut Vec<f64>) -> Result<(), TransformError> {
        let column = &self.columns[i];
        match &self.encoding {
            Encoding::OneHot {
                categories,
                ignore_unknown,
            } => {
                let cats = &categories[i];
                let label = value.as_category();
                match cats.iter().position(|c| *c == label) {
                    Some(hot) => out.extend((0..cats.len()).map(|k| if k == hot { 1.0 } else { 0.0 })),
                    None if *ignore_unknown => out.extend(std::iter::repeat(0.0).take(cats.len())),
                    None => {
                        return Err(TransformError::UnknownCategory {
                            column: column.clone(),
                            value: label,
                        })
                    }
                }
            }
            Encoding::Ordinal { categories } => {
                let label = value.as_category();
                let code = categories[i].iter().position(|c| *c == label).ok_or_else(|| {
                    TransformError::UnknownCategory {
                        column: column.clone(),
                        value: label.clone(),
                    }
                })?;
                out.push(code as f64);
            }
            Encoding::Affine {
                shift,
                factor,
                offset,
            } => {
                let x = numeric(column, value)?;
                out.push((x - shift[i]) * factor[i] + offset[i]);
            }
            Encoding::Passthrough => out.push(numeric(column, value)?),
        }
        Ok(())
    }
}

fn numeric(column: &str, value: &RawValue) -> Result<f64, TransformError> {
    value.as_number().ok_or_else(|| TransformError::NotNumeric {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Fitted column transformer loaded from a JSON artifact.
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    steps: Vec<Step>,
    output_names: Vec<String>,
    groups: Vec<FeatureGroup>,
}

impl ColumnTransformer {
    /// Parse a pipeline artifact.
    ///
    /// # Errors
    /// Returns error for malformed JSON, unknown step types or inconsistent parameters.
    pub fn from_json(content: &[u8]) -> Result<Self, PipelineError> {
        let doc: PipelineDocument = serde_json::from_slice(content)?;
        if doc.format_version != FORMAT_VERSION {
            return Err(PipelineError::UnsupportedVersion(doc.format_version));
        }
        if doc.steps.is_empty() {
            return Err(PipelineError::Malformed("pipeline has no steps".into()));
        }

        let steps = doc
            .steps
            .into_iter()
            .map(Step::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        let mut output_names = Vec::new();
        let mut groups = Vec::new();
        for step in &steps {
            for (i, column) in step.columns.iter().enumerate() {
                if !seen.insert(column.clone()) {
                    return Err(PipelineError::DuplicateColumn(column.clone()));
                }
                groups.push(FeatureGroup {
                    column: column.clone(),
                    start: output_names.len(),
                    len: step.width(i),
                });
                output_names.extend(step.output_names(i));
            }
            tracing::debug!(
                step = %step.name,
                kind = step.kind,
                columns = step.columns.len(),
                "Loaded pipeline step"
            );
        }

        Ok(Self {
            steps,
            output_names,
            groups,
        })
    }

    /// Step names and types in execution order.
    #[must_use]
    pub fn step_summary(&self) -> Vec<(String, &'static str)> {
        self.steps
            .iter()
            .map(|s| (s.name.clone(), s.kind))
            .collect()
    }
}

impl Preprocessor for ColumnTransformer {
    fn input_columns(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.columns.iter().map(String::as_str))
            .collect()
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn output_groups(&self) -> &[FeatureGroup] {
        &self.groups
    }

    fn transform(&self, row: &RawRow) -> Result<Vec<f64>, TransformError> {
        let mut out = Vec::with_capacity(self.output_names.len());
        for step in &self.steps {
            for (i, column) in step.columns.iter().enumerate() {
                let value = row
                    .get(column)
                    .ok_or_else(|| TransformError::MissingColumn(column.clone()))?;
                step.encode(i, value, &mut out)?;
            }
        }
        Ok(out)
    }
}

/// List the step types of an artifact that are not trusted by default.
///
/// Only the `type` tags are inspected; nothing else is interpreted.
///
/// # Errors
/// Returns error if the artifact is not JSON or has no `steps` array.
pub fn untrusted_types(content: &[u8]) -> Result<Vec<String>, PipelineError> {
    let doc: serde_json::Value = serde_json::from_slice(content)?;
    let steps = doc
        .get("steps")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| PipelineError::Malformed("missing `steps` array".into()))?;

    let mut types: Vec<String> = steps
        .iter()
        .map(|step| {
            step.get("type")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| PipelineError::Malformed("step without a `type` tag".into()))
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|t| !DEFAULT_TRUSTED_TYPES.contains(&t.as_str()))
        .collect();
    types.sort();
    types.dedup();
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline_json() -> serde_json::Value {
        json!({
            "format_version": 1,
            "steps": [
                {
                    "type": "one_hot_encoder",
                    "name": "cat",
                    "columns": ["coupon", "expiration"],
                    "categories": [["Coffee House", "Restaurant(<20)"], ["1d", "2h"]]
                },
                {
                    "type": "ordinal_encoder",
                    "name": "ord",
                    "columns": ["Bar"],
                    "categories": [["never", "less1", "1~3", "4~8", "gt8"]]
                },
                {
                    "type": "standard_scaler",
                    "name": "num",
                    "columns": ["age", "temperature"],
                    "mean": [30.0, 60.0],
                    "scale": [10.0, 0.0]
                },
                {
                    "type": "passthrough",
                    "name": "bin",
                    "columns": ["has_children"]
                }
            ]
        })
    }

    fn load(value: &serde_json::Value) -> Result<ColumnTransformer, PipelineError> {
        ColumnTransformer::from_json(value.to_string().as_bytes())
    }

    fn row(pairs: &[(&str, RawValue)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn sample_row() -> RawRow {
        row(&[
            ("coupon", text("Restaurant(<20)")),
            ("expiration", text("1d")),
            ("Bar", text("4~8")),
            ("age", RawValue::Number(45.0)),
            ("temperature", RawValue::Number(80.0)),
            ("has_children", RawValue::Number(1.0)),
            ("unused", text("ignored")),
        ])
    }

    #[test]
    fn test_output_names_follow_step_prefixes() {
        let pipeline = load(&pipeline_json()).expect("Should load");
        assert_eq!(
            pipeline.output_names(),
            &[
                "cat__coupon_Coffee House",
                "cat__coupon_Restaurant(<20)",
                "cat__expiration_1d",
                "cat__expiration_2h",
                "ord__Bar",
                "num__age",
                "num__temperature",
                "bin__has_children",
            ]
        );
        assert_eq!(pipeline.output_dim(), 8);
        assert_eq!(pipeline.input_columns().len(), 6);
    }

    #[test]
    fn test_groups_cover_outputs_contiguously() {
        let pipeline = load(&pipeline_json()).expect("Should load");
        let groups = pipeline.output_groups();
        assert_eq!(groups.len(), 6);
        assert_eq!(groups[0].range(), 0..2);
        assert_eq!(groups[1].range(), 2..4);
        assert_eq!(groups[2].column, "Bar");
        let covered: usize = groups.iter().map(|g| g.len).sum();
        assert_eq!(covered, pipeline.output_dim());
    }

    #[test]
    fn test_transform_encodes_every_step() {
        let pipeline = load(&pipeline_json()).expect("Should load");
        let x = pipeline.transform(&sample_row()).expect("Should transform");
        // temperature has zero scale, so it is only centered
        assert_eq!(x, vec![0.0, 1.0, 1.0, 0.0, 3.0, 1.5, 20.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_is_an_error_by_default() {
        let pipeline = load(&pipeline_json()).expect("Should load");
        let mut r = sample_row();
        r.insert("coupon".into(), text("Bar"));
        assert_eq!(
            pipeline.transform(&r),
            Err(TransformError::UnknownCategory {
                column: "coupon".into(),
                value: "Bar".into()
            })
        );
    }

    #[test]
    fn test_unknown_category_ignored_when_configured() {
        let mut doc = pipeline_json();
        doc["steps"][0]["handle_unknown"] = json!("ignore");
        let pipeline = load(&doc).expect("Should load");

        let mut r = sample_row();
        r.insert("coupon".into(), text("Bar"));
        let x = pipeline.transform(&r).expect("Should transform");
        assert_eq!(&x[..2], &[0.0, 0.0]);
    }

    #[test]
    fn test_missing_and_non_numeric_columns() {
        let pipeline = load(&pipeline_json()).expect("Should load");

        let mut r = sample_row();
        r.remove("Bar");
        assert_eq!(
            pipeline.transform(&r),
            Err(TransformError::MissingColumn("Bar".into()))
        );

        let mut r = sample_row();
        r.insert("age".into(), text("forty"));
        assert!(matches!(
            pipeline.transform(&r),
            Err(TransformError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_min_max_scaler() {
        let doc = json!({
            "format_version": 1,
            "steps": [{
                "type": "min_max_scaler",
                "name": "mm",
                "columns": ["temperature"],
                "data_min": [30.0],
                "data_max": [80.0],
                "feature_range": [-1.0, 1.0]
            }]
        });
        let pipeline = load(&doc).expect("Should load");
        let x = pipeline
            .transform(&row(&[("temperature", RawValue::Number(55.0))]))
            .expect("Should transform");
        assert!((x[0] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_inconsistent_artifacts() {
        let mut doc = pipeline_json();
        doc["steps"][2]["mean"] = json!([30.0]);
        assert!(matches!(load(&doc), Err(PipelineError::InvalidStep { .. })));

        let mut doc = pipeline_json();
        doc["steps"][3]["columns"] = json!(["age"]);
        assert!(matches!(load(&doc), Err(PipelineError::DuplicateColumn(c)) if c == "age"));

        let mut doc = pipeline_json();
        doc["format_version"] = json!(2);
        assert!(matches!(load(&doc), Err(PipelineError::UnsupportedVersion(2))));

        let mut doc = pipeline_json();
        doc["steps"][0]["type"] = json!("function_transformer");
        assert!(matches!(load(&doc), Err(PipelineError::Json(_))));
    }

    #[test]
    fn test_untrusted_types_lists_non_default_tags() {
        let mut doc = pipeline_json();
        assert!(untrusted_types(doc.to_string().as_bytes())
            .expect("Should scan")
            .is_empty());

        doc["steps"][2]["type"] = json!("min_max_scaler");
        doc["steps"][3]["type"] = json!("function_transformer");
        assert_eq!(
            untrusted_types(doc.to_string().as_bytes()).expect("Should scan"),
            vec!["function_transformer".to_string(), "min_max_scaler".to_string()]
        );

        assert!(untrusted_types(b"{\"steps\": 3}").is_err());
    }
}
