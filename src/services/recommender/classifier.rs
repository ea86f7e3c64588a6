//! Gradient-boosted tree classifier.
//!
//! Reads the JSON model written by XGBoost's `save_model("*.json")` for a
//! `binary:logistic` objective and evaluates it without the XGBoost runtime.
//!
//! ```json
//! {
//!   "learner": {
//!     "feature_names": ["movie_id", "runtime", ...],
//!     "learner_model_param": { "base_score": "5E-1", "num_feature": "108" },
//!     "objective": { "name": "binary:logistic" },
//!     "gradient_booster": {
//!       "name": "gbtree",
//!       "model": { "trees": [ {
//!         "left_children": [1, -1, -1],
//!         "right_children": [2, -1, -1],
//!         "split_indices": [1, 0, 0],
//!         "split_conditions": [95.0, -0.4, 0.3],
//!         "default_left": [1, 0, 0]
//!       } ] }
//!     }
//!   }
//! }
//! ```
//!
//! Leaves are nodes whose left child is `-1`; their value is stored in
//! `split_conditions`. The probability is `sigmoid(logit(base_score) + Σ leaves)`.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use super::error::RecommendError;

/// A pre-trained binary classifier over one feature row
pub trait Classifier: Send + Sync {
    /// Number of input columns the model was trained with
    fn num_features(&self) -> usize;

    /// Column labels recorded at training time, if the model carries them
    fn feature_names(&self) -> Option<&[String]>;

    /// Probability of the positive ("liked") class, in `[0, 1]`
    fn predict_proba(&self, row: &[f32]) -> f32;
}

#[derive(Debug, Clone)]
struct Tree {
    left: Vec<i32>,
    right: Vec<i32>,
    split_index: Vec<u32>,
    split_condition: Vec<f32>,
    default_left: Vec<bool>,
}

impl Tree {
    fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut node = 0usize;
        loop {
            let left = self.left[node];
            if left < 0 {
                return self.split_condition[node];
            }
            let value = row[self.split_index[node] as usize];
            let go_left = if value.is_nan() {
                self.default_left[node]
            } else {
                value < self.split_condition[node]
            };
            let next = if go_left { left } else { self.right[node] };
            node = next as usize;
        }
    }

    /// Checks array lengths, feature indices and that children always come
    /// after their parent so traversal terminates
    fn validate(&self, num_features: usize) -> Result<(), String> {
        let n = self.left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.right.len() != n
            || self.split_index.len() != n
            || self.split_condition.len() != n
            || self.default_left.len() != n
        {
            return Err("tree arrays have different lengths".to_string());
        }

        for node in 0..n {
            let (left, right) = (self.left[node], self.right[node]);
            if left < 0 {
                continue;
            }
            for child in [left, right] {
                if child as usize <= node || child as usize >= n {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }
            if self.split_index[node] as usize >= num_features {
                return Err(format!(
                    "node {} splits on feature {} of {}",
                    node, self.split_index[node], num_features
                ));
            }
        }
        Ok(())
    }
}

/// Tree ensemble evaluated on the margin scale, then squashed by a sigmoid
#[derive(Debug, Clone)]
pub struct GbdtClassifier {
    trees: Vec<Tree>,
    base_margin: f32,
    num_features: usize,
    feature_names: Option<Vec<String>>,
}

impl GbdtClassifier {
    /// Parses an XGBoost JSON model
    pub fn from_json(source: &str, path: &str) -> Result<Self, RecommendError> {
        let file: XgbModelFile =
            serde_json::from_str(source).map_err(|e| RecommendError::format(path, e))?;
        let learner = file.learner;

        if learner.objective.name != "binary:logistic" {
            return Err(RecommendError::format(
                path,
                format!("unsupported objective {}", learner.objective.name),
            ));
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(RecommendError::format(
                path,
                format!("unsupported booster {}", learner.gradient_booster.name),
            ));
        }

        let num_features = learner
            .learner_model_param
            .num_feature
            .parse::<usize>()
            .map_err(|e| RecommendError::format(path, format!("num_feature: {}", e)))?;

        let base_score = parse_base_score(&learner.learner_model_param.base_score)
            .ok_or_else(|| {
                RecommendError::format(
                    path,
                    format!(
                        "base_score {} is not a probability",
                        learner.learner_model_param.base_score
                    ),
                )
            })?;

        let model = learner.gradient_booster.model;

        if let Some((i, _)) = model
            .trees
            .iter()
            .enumerate()
            .find(|(_, t)| t.split_type.iter().any(|&st| st != 0) || !t.categories.is_empty())
        {
            return Err(RecommendError::format(
                path,
                format!("tree {} uses categorical splits", i),
            ));
        }

        let kept = match learner.attributes.get("best_iteration") {
            Some(raw) => {
                let best = raw.parse::<usize>().map_err(|e| {
                    RecommendError::format(path, format!("best_iteration: {}", e))
                })?;
                let per_round = match &model.gbtree_model_param {
                    Some(param) => param.num_parallel_tree.parse::<usize>().map_err(|e| {
                        RecommendError::format(path, format!("num_parallel_tree: {}", e))
                    })?,
                    None => 1,
                };
                (best + 1).saturating_mul(per_round.max(1))
            }
            None => model.trees.len(),
        };
        if kept > model.trees.len() {
            return Err(RecommendError::format(
                path,
                format!(
                    "best_iteration needs {} trees, model has {}",
                    kept,
                    model.trees.len()
                ),
            ));
        }

        // Early-stopped models predict with the trees up to the best round only
        let trees: Vec<Tree> = model
            .trees
            .into_iter()
            .take(kept)
            .map(|t| Tree {
                left: t.left_children,
                right: t.right_children,
                split_index: t.split_indices,
                split_condition: t.split_conditions,
                default_left: t.default_left,
            })
            .collect();

        for (i, tree) in trees.iter().enumerate() {
            tree.validate(num_features)
                .map_err(|e| RecommendError::format(path, format!("tree {}: {}", i, e)))?;
        }

        let feature_names = if learner.feature_names.is_empty() {
            None
        } else {
            Some(learner.feature_names)
        };

        Ok(Self {
            trees,
            base_margin: (base_score / (1.0 - base_score)).ln(),
            num_features,
            feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for GbdtClassifier {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, row: &[f32]) -> f32 {
        let margin = self
            .trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(row));
        1.0 / (1.0 + (-margin).exp())
    }
}

/// Newer XGBoost releases write `"[5E-1]"` instead of `"5E-1"`
fn parse_base_score(raw: &str) -> Option<f32> {
    let value = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<f32>()
        .ok()?;
    (value > 0.0 && value < 1.0).then_some(value)
}

#[derive(Deserialize)]
struct XgbModelFile {
    learner: XgbLearner,
}

#[derive(Deserialize)]
struct XgbLearner {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbBooster,
    learner_model_param: XgbLearnerParam,
    objective: XgbObjective,
}

#[derive(Deserialize)]
struct XgbBooster {
    name: String,
    model: XgbTreeModel,
}

#[derive(Deserialize)]
struct XgbTreeModel {
    #[serde(default)]
    gbtree_model_param: Option<XgbTreeModelParam>,
    trees: Vec<XgbTree>,
}

#[derive(Deserialize)]
struct XgbTreeModelParam {
    #[serde(default = "default_num_parallel_tree")]
    num_parallel_tree: String,
}

fn default_num_parallel_tree() -> String {
    "1".to_string()
}

#[derive(Deserialize)]
struct XgbTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    #[serde(deserialize_with = "flags")]
    default_left: Vec<bool>,
    /// 0 for numeric splits, 1 for categorical
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    categories: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct XgbLearnerParam {
    base_score: String,
    num_feature: String,
}

#[derive(Deserialize)]
struct XgbObjective {
    name: String,
}

/// `default_left` is written as booleans by old releases and 0/1 by new ones
fn flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u8),
    }

    let raw = Vec::<Flag>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|flag| match flag {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        })
        .collect())
}
