//! JSON random-forest artifacts.
//!
//! Layout:
//!
//! ```json
//! {
//!   "feature_names": ["Agent", "Topic", "Speed of answer in seconds", "AvgTalkDuration"],
//!   "classes": [1, 2, 3, 4, 5],
//!   "trees": [
//!     { "nodes": [
//!         { "kind": "split", "feature": 3, "threshold": 120.5, "left": 1, "right": 2 },
//!         { "kind": "leaf", "value": [0, 3, 10, 2, 1] },
//!         { "kind": "leaf", "value": [4, 1, 0, 0, 0] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Node 0 is the root. A row goes left when `x[feature] <= threshold`, with `x`
//! cast to `f32` first as scikit-learn does. Leaf
//! values are per-class sample counts (or probabilities); each leaf is
//! normalized, the forest averages them and picks the most probable class.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{FeatureRow, ModelError, SatisfactionModel, FEATURE_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_names: Vec<String>,
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl ForestModel {
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound {
                path: path.display().to_string(),
            });
        }
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let model: ForestModel =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Corrupt(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names != FEATURE_COLUMNS {
            return Err(ModelError::SchemaMismatch {
                expected: format!("{:?}", self.feature_names),
                actual: format!("{:?}", FEATURE_COLUMNS),
            });
        }
        if self.classes.is_empty() {
            return Err(ModelError::Corrupt("no classes".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Corrupt("no trees".to_string()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Corrupt(format!("tree {t} has no nodes")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    // Children must come after their parent, which also rules out cycles.
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= FEATURE_COLUMNS.len() {
                            return Err(ModelError::Corrupt(format!(
                                "tree {t} node {i}: feature index {feature} out of range"
                            )));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(ModelError::Corrupt(format!(
                                    "tree {t} node {i}: child index {child} invalid"
                                )));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(ModelError::Corrupt(format!(
                                "tree {t} node {i}: leaf has {} values for {} classes",
                                value.len(),
                                self.classes.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mean class probabilities over all trees.
    pub fn predict_proba(&self, row: &FeatureRow) -> Vec<f64> {
        let x = row.values();
        let mut proba = vec![0.0; self.classes.len()];

        for tree in &self.trees {
            let leaf = tree.leaf_for(&x);
            let total: f64 = leaf.iter().sum();
            if total > 0.0 {
                for (p, v) in proba.iter_mut().zip(leaf) {
                    *p += v / total;
                }
            }
        }

        let n = self.trees.len() as f64;
        for p in &mut proba {
            *p /= n;
        }
        proba
    }
}

impl DecisionTree {
    fn leaf_for(&self, x: &[f32; 4]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if f64::from(x[*feature]) <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

impl SatisfactionModel for ForestModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<i64>, ModelError> {
        Ok(rows
            .iter()
            .map(|row| {
                let proba = self.predict_proba(row);
                // First maximum wins on ties.
                let best = proba
                    .iter()
                    .enumerate()
                    .fold(0, |best, (i, p)| if *p > proba[best] { i } else { best });
                self.classes[best]
            })
            .collect())
    }

    fn name(&self) -> &str {
        "forest"
    }
}
