//! XGBoost adapter: Implementation of Classifier for XGBoost JSON models.
//!
//! Reads the document written by `XGBClassifier.save_model("*.json")` and
//! evaluates the tree ensemble natively.
//!
//! # Supported models
//!
//! - booster `gbtree`, objective `binary:logistic`
//! - numeric splits only: `x < split_condition` goes left, missing values (NaN)
//!   follow `default_left`
//! - `base_score` stored in probability space (XGBoost >= 1.0), turned into a
//!   margin with the logit
//!
//! Split comparisons are done in `f32` like XGBoost's own predictor so that
//! values sitting exactly on a split boundary land on the same side.

use serde::Deserialize;

use crate::ports::Classifier;

/// Errors raised while reading a model document.
#[derive(Debug, thiserror::Error)]
pub enum XgbError {
    #[error("Invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported booster `{0}` (expected gbtree)")]
    UnsupportedBooster(String),

    #[error("Unsupported objective `{0}` (expected binary:logistic)")]
    UnsupportedObjective(String),

    #[error("Invalid model parameter {name}: `{value}`")]
    InvalidParam { name: &'static str, value: String },

    #[error("Tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: LearnerDocument,
    #[serde(default)]
    version: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct LearnerDocument {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterDocument,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveDocument,
}

#[derive(Debug, Deserialize)]
struct BoosterDocument {
    name: String,
    #[serde(default)]
    model: Option<GbTreeDocument>,
}

#[derive(Debug, Deserialize)]
struct GbTreeDocument {
    trees: Vec<TreeDocument>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveDocument {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeDocument {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i64>,
}

/// `default_left` is written as 0/1 by some releases and as booleans by others.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Int(i64),
    Bool(bool),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Self::Int(v) => v != 0,
            Self::Bool(v) => v,
        }
    }
}

/// One regression tree in flat array form.
#[derive(Debug, Clone)]
struct Tree {
    left: Vec<i64>,
    right: Vec<i64>,
    split_index: Vec<usize>,
    /// Split threshold for internal nodes, leaf value for leaves
    value: Vec<f64>,
    default_left: Vec<bool>,
}

impl Tree {
    fn from_document(id: usize, doc: TreeDocument, n_features: usize) -> Result<Self, XgbError> {
        let malformed = |reason: String| XgbError::MalformedTree { tree: id, reason };

        let n = doc.left_children.len();
        if n == 0 {
            return Err(malformed("tree has no nodes".into()));
        }
        let lengths = [
            doc.right_children.len(),
            doc.split_indices.len(),
            doc.split_conditions.len(),
            doc.default_left.len(),
        ];
        if lengths.iter().any(|&l| l != n) {
            return Err(malformed(format!(
                "node arrays disagree in length (expected {n}, got {lengths:?})"
            )));
        }
        if doc.split_type.iter().any(|&t| t != 0) {
            return Err(malformed("categorical splits are not supported".into()));
        }

        let mut split_index = Vec::with_capacity(n);
        for node in 0..n {
            let left = doc.left_children[node];
            let right = doc.right_children[node];
            let is_leaf = left == -1;

            if is_leaf {
                if right != -1 {
                    return Err(malformed(format!("node {node} has only a right child")));
                }
                split_index.push(0);
                continue;
            }

            // Children always come after their parent, which also rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(malformed(format!(
                        "node {node} points to invalid child {child}"
                    )));
                }
            }

            let feature = doc.split_indices[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(malformed(format!(
                    "node {node} splits on feature {feature}, model has {n_features}"
                )));
            }
            split_index.push(feature as usize);
        }

        Ok(Self {
            left: doc.left_children,
            right: doc.right_children,
            split_index,
            value: doc.split_conditions,
            default_left: doc.default_left.into_iter().map(Flag::is_set).collect(),
        })
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.left[node];
            if left < 0 {
                return self.value[node];
            }

            let x = features
                .get(self.split_index[node])
                .copied()
                .unwrap_or(f64::NAN);

            let go_left = if x.is_nan() {
                self.default_left[node]
            } else {
                (x as f32) < (self.value[node] as f32)
            };

            let next = if go_left { left } else { self.right[node] };
            node = next as usize;
        }
    }

    fn node_count(&self) -> usize {
        self.left.len()
    }
}

/// Gradient-boosted tree ensemble loaded from an XGBoost JSON document.
#[derive(Debug, Clone)]
pub struct XgbClassifier {
    trees: Vec<Tree>,
    base_margin: f64,
    n_features: usize,
    feature_names: Vec<String>,
    version: Vec<u32>,
}

impl XgbClassifier {
    /// Parse a model document.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or describes an unsupported model.
    pub fn from_json(content: &[u8]) -> Result<Self, XgbError> {
        let doc: ModelDocument = serde_json::from_slice(content)?;
        let learner = doc.learner;

        if learner.objective.name != "binary:logistic" {
            return Err(XgbError::UnsupportedObjective(learner.objective.name));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(XgbError::UnsupportedBooster(learner.gradient_booster.name));
        }

        let params = &learner.learner_model_param;
        if let Some(num_class) = &params.num_class {
            if parse_param::<u32>("num_class", num_class)? > 1 {
                return Err(XgbError::UnsupportedObjective(format!(
                    "multi-class model with num_class={num_class}"
                )));
            }
        }
        let n_features: usize = parse_param("num_feature", &params.num_feature)?;
        if n_features == 0 {
            return Err(XgbError::InvalidParam {
                name: "num_feature",
                value: params.num_feature.clone(),
            });
        }

        let base_score: f64 = parse_param("base_score", &params.base_score)?;
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(XgbError::InvalidParam {
                name: "base_score",
                value: params.base_score.clone(),
            });
        }
        let base_margin = (base_score / (1.0 - base_score)).ln();

        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| XgbError::UnsupportedBooster("gbtree without model".into()))?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(id, doc)| Tree::from_document(id, doc, n_features))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            n_trees = trees.len(),
            n_features,
            base_score,
            "Parsed XGBoost model"
        );

        Ok(Self {
            trees,
            base_margin,
            n_features,
            feature_names: learner.feature_names,
            version: doc.version,
        })
    }

    /// Raw additive score before the logistic link.
    #[must_use]
    pub fn margin(&self, features: &[f64]) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|tree| tree.leaf_value(features))
                .sum::<f64>()
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.trees.iter().map(Tree::node_count).sum()
    }

    /// Feature names stored in the model, empty when trained on a bare array.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// XGBoost release that wrote the document, e.g. `2.0.3`.
    #[must_use]
    pub fn writer_version(&self) -> Option<String> {
        if self.version.is_empty() {
            return None;
        }
        Some(
            self.version
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join("."),
        )
    }
}

impl Classifier for XgbClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(self.margin(features))
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// XGBoost stores scalar params as strings, newer releases wrap them in brackets.
fn parse_param<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, XgbError> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .parse()
        .map_err(|_| XgbError::InvalidParam {
            name,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Two stumps on features 0 and 1, plus a depth-2 tree on feature 2.
    fn model_json(base_score: &str) -> serde_json::Value {
        json!({
            "learner": {
                "attributes": {},
                "feature_names": [],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "2"},
                        "tree_info": [0, 0],
                        "trees": [
                            {
                                "id": 0,
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [0, 0, 0],
                                "split_conditions": [0.5, -0.4, 0.6],
                                "default_left": [1, 0, 0],
                                "split_type": [0, 0, 0],
                                "tree_param": {"num_nodes": "3", "num_feature": "3"}
                            },
                            {
                                "id": 1,
                                "left_children": [1, -1, 3, -1, -1],
                                "right_children": [2, -1, 4, -1, -1],
                                "split_indices": [1, 0, 2, 0, 0],
                                "split_conditions": [2.0, -0.2, 0.5, 0.1, 0.3],
                                "default_left": [false, false, true, false, false],
                                "tree_param": {"num_nodes": "5", "num_feature": "3"}
                            }
                        ]
                    }
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "num_class": "0",
                    "num_feature": "3",
                    "num_target": "1"
                },
                "objective": {"name": "binary:logistic", "reg_loss_param": {"scale_pos_weight": "1"}}
            },
            "version": [2, 0, 3]
        })
    }

    fn load(value: &serde_json::Value) -> Result<XgbClassifier, XgbError> {
        XgbClassifier::from_json(value.to_string().as_bytes())
    }

    #[test]
    fn test_parses_model_document() {
        let model = load(&model_json("5E-1")).expect("Should parse");
        assert_eq!(model.n_trees(), 2);
        assert_eq!(model.n_nodes(), 8);
        assert_eq!(model.n_features(), 3);
        assert_eq!(model.writer_version().as_deref(), Some("2.0.3"));
    }

    #[test]
    fn test_margin_walks_every_tree() {
        let model = load(&model_json("5E-1")).expect("Should parse");

        // f0=1 -> 0.6; f1=3 -> right, f2=1 -> 0.3
        assert!((model.margin(&[1.0, 3.0, 1.0]) - 0.9).abs() < 1e-12);
        // f0=0 -> -0.4; f1=0 -> -0.2
        assert!((model.margin(&[0.0, 0.0, 1.0]) + 0.6).abs() < 1e-12);

        let p = model.predict_proba(&[1.0, 3.0, 1.0]);
        assert!((p - 1.0 / (1.0 + (-0.9f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_follow_default_direction() {
        let model = load(&model_json("0.5")).expect("Should parse");
        // NaN on f0 goes left (-0.4); NaN on f1 goes right, NaN on f2 goes left (0.1)
        let m = model.margin(&[f64::NAN, f64::NAN, f64::NAN]);
        assert!((m + 0.3).abs() < 1e-12);
        // Short vectors behave as missing trailing values
        assert!((model.margin(&[]) - m).abs() < 1e-12);
    }

    #[test]
    fn test_split_boundary_goes_right() {
        let model = load(&model_json("0.5")).expect("Should parse");
        assert!((model.margin(&[0.5, 0.0, 0.0]) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_base_score_becomes_logit_margin() {
        let model = load(&model_json("[2.5E-1]")).expect("Should parse bracketed score");
        let expected = (0.25f64 / 0.75).ln() + 0.6 - 0.2;
        assert!((model.margin(&[1.0, 0.0, 0.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_checked_proba_rejects_wrong_dimension() {
        let model = load(&model_json("0.5")).expect("Should parse");
        assert!(model.checked_proba(&[0.0; 3]).is_ok());
        assert!(matches!(
            model.checked_proba(&[0.0; 2]),
            Err(crate::ports::ModelError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_rejects_unsupported_objective() {
        let mut doc = model_json("0.5");
        doc["learner"]["objective"]["name"] = json!("reg:squarederror");
        assert!(matches!(
            load(&doc),
            Err(XgbError::UnsupportedObjective(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_split_feature() {
        let mut doc = model_json("0.5");
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["split_indices"] = json!([7, 0, 0]);
        let err = load(&doc).expect_err("must fail");
        assert!(err.to_string().contains("feature 7"));
    }

    #[test]
    fn test_rejects_backward_child_pointer() {
        let mut doc = model_json("0.5");
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] = json!([0, -1, -1]);
        assert!(matches!(
            load(&doc),
            Err(XgbError::MalformedTree { tree: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_categorical_splits() {
        let mut doc = model_json("0.5");
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["split_type"] = json!([1, 0, 0]);
        assert!(load(&doc).is_err());
    }

    #[test]
    fn test_rejects_degenerate_base_score() {
        assert!(matches!(
            load(&model_json("1.0")),
            Err(XgbError::InvalidParam { name: "base_score", .. })
        ));
        assert!(load(&model_json("abc")).is_err());
    }
}
