//! Fitted tree-based models and the uniform prediction interface
//!
//! Models are produced by an external fitting library and are read-only
//! here. The variant set is closed:
//! - [`RegressionTree`]: a single tree, leaf values returned as-is
//! - [`RandomForest`]: average over trees
//! - [`BoostedEnsemble`]: additive link-scale trees plus inverse link

mod boosted;
mod forest;
mod tree;

pub use boosted::{BoostedEnsemble, Distribution};
pub use forest::RandomForest;
pub use tree::{RegressionTree, SplitRule, TreeNode};

use crate::data::Dataset;
use crate::error::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A fitted model of one of the supported kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    Tree(RegressionTree),
    Forest(RandomForest),
    Boosted(BoostedEnsemble),
}

impl FittedModel {
    /// Short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            FittedModel::Tree(_) => "tree",
            FittedModel::Forest(_) => "forest",
            FittedModel::Boosted(_) => "boosted",
        }
    }

    /// Features the model references, in index order
    pub fn features(&self) -> &[String] {
        match self {
            FittedModel::Tree(m) => m.features(),
            FittedModel::Forest(m) => m.features(),
            FittedModel::Boosted(m) => m.features(),
        }
    }

    /// One response-scale prediction per row, in row order.
    ///
    /// Every feature in [`features`](Self::features) must be a column of
    /// `data`; the first absent one fails with `MissingFeature` before any
    /// traversal happens.
    pub fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        data.require_columns(self.features())?;
        match self {
            FittedModel::Tree(m) => m.predict(data),
            FittedModel::Forest(m) => m.predict(data),
            FittedModel::Boosted(m) => m.predict(data),
        }
    }

    /// Raw non-negative importance score per feature
    pub fn raw_importance(&self) -> Vec<f64> {
        match self {
            FittedModel::Tree(m) => m.raw_importance(),
            FittedModel::Forest(m) => m.raw_importance(),
            FittedModel::Boosted(m) => m.raw_importance(),
        }
    }

    /// Number of trees used for prediction
    pub fn n_trees(&self) -> usize {
        match self {
            FittedModel::Tree(_) => 1,
            FittedModel::Forest(m) => m.n_trees(),
            FittedModel::Boosted(m) => m.n_trees(),
        }
    }

    /// Configured interaction depth (boosted ensembles only)
    pub fn interaction_depth(&self) -> Option<usize> {
        match self {
            FittedModel::Boosted(m) => Some(m.interaction_depth()),
            _ => None,
        }
    }

    pub fn as_boosted(&self) -> Option<&BoostedEnsemble> {
        match self {
            FittedModel::Boosted(m) => Some(m),
            _ => None,
        }
    }

    /// Structural checks (feature indices, ensemble size)
    pub fn validate(&self) -> Result<()> {
        match self {
            FittedModel::Tree(m) => m.validate(),
            FittedModel::Forest(m) => m.validate(),
            FittedModel::Boosted(m) => m.validate(),
        }
    }

    /// Parse and validate a JSON model export
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: FittedModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let model = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            kind = model.kind(),
            n_trees = model.n_trees(),
            "Loaded model"
        );
        Ok(model)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl From<RegressionTree> for FittedModel {
    fn from(model: RegressionTree) -> Self {
        FittedModel::Tree(model)
    }
}

impl From<RandomForest> for FittedModel {
    fn from(model: RandomForest) -> Self {
        FittedModel::Forest(model)
    }
}

impl From<BoostedEnsemble> for FittedModel {
    fn from(model: BoostedEnsemble) -> Self {
        FittedModel::Boosted(model)
    }
}

/// Predict `rows` with `model`; see [`FittedModel::predict`]
pub fn predict(model: &FittedModel, rows: &Dataset) -> Result<Array1<f64>> {
    model.predict(rows)
}
