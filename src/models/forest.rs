//! Random forest representation

use super::tree::{evaluate_trees, TreeNode};
use crate::data::Dataset;
use crate::error::{InsightError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Random forest: the prediction is the simple average of its trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForestExport")]
pub struct RandomForest {
    features: Vec<String>,
    trees: Vec<TreeNode>,
}

/// Unchecked wire form of [`RandomForest`]
#[derive(Deserialize)]
struct ForestExport {
    features: Vec<String>,
    trees: Vec<TreeNode>,
}

impl TryFrom<ForestExport> for RandomForest {
    type Error = InsightError;

    fn try_from(export: ForestExport) -> Result<Self> {
        Self::new(export.features, export.trees)
    }
}

impl RandomForest {
    pub fn new(features: Vec<String>, trees: Vec<TreeNode>) -> Result<Self> {
        let forest = Self { features, trees };
        forest.validate()?;
        Ok(forest)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn trees(&self) -> &[TreeNode] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        let n_trees = self.trees.len() as f64;
        evaluate_trees(&self.trees, &self.features, data, |leaves| {
            leaves.sum::<f64>() / n_trees
        })
    }

    /// Split improvements summed over all trees
    pub fn raw_importance(&self) -> Vec<f64> {
        let mut scores = vec![0.0; self.features.len()];
        for tree in &self.trees {
            tree.accumulate_importance(&mut scores);
        }
        scores
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(InsightError::ValidationError(
                "Random forest must contain at least one tree".to_string(),
            ));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.features.len()))
    }
}
