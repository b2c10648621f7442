//! Regression tree representation and traversal

use crate::data::{Dataset, FeatureColumn};
use crate::error::{InsightError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Split rule of an internal node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitRule {
    /// Numeric split: `x <= value` goes left
    Threshold { value: f64 },
    /// Categorical split: levels listed here go left, every other level
    /// (including unseen ones) goes right
    Levels { left: Vec<String> },
}

impl SplitRule {
    /// Route one row of `column` through the rule.
    ///
    /// Mixed kinds are matched on the textual/numeric form of the value, so a
    /// threshold rule on a column of numeric codes stored as strings still
    /// routes correctly. NaN and unparsable values go right.
    pub fn goes_left(&self, column: &FeatureColumn, row: usize) -> bool {
        match (self, column) {
            (SplitRule::Threshold { value }, FeatureColumn::Numeric(v)) => v[row] <= *value,
            (SplitRule::Threshold { value }, FeatureColumn::Categorical(v)) => v[row]
                .trim()
                .parse::<f64>()
                .map(|x| x <= *value)
                .unwrap_or(false),
            (SplitRule::Levels { left }, FeatureColumn::Categorical(v)) => {
                left.iter().any(|level| *level == v[row])
            }
            (SplitRule::Levels { left }, FeatureColumn::Numeric(v)) => left
                .iter()
                .any(|level| level.trim().parse::<f64>().map_or(false, |x| x == v[row])),
        }
    }
}

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        #[serde(default)]
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        rule: SplitRule,
        /// Loss reduction achieved by this split at fit time
        #[serde(default)]
        improvement: f64,
        #[serde(default)]
        n_samples: usize,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn leaf(value: f64) -> Self {
        TreeNode::Leaf { value, n_samples: 0 }
    }

    pub fn split(feature_idx: usize, rule: SplitRule, improvement: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split {
            feature_idx,
            rule,
            improvement,
            n_samples: 0,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Numeric split shorthand
    pub fn threshold(feature_idx: usize, value: f64, improvement: f64, left: TreeNode, right: TreeNode) -> Self {
        Self::split(feature_idx, SplitRule::Threshold { value }, improvement, left, right)
    }

    /// Categorical split shorthand
    pub fn levels<S: Into<String>>(
        feature_idx: usize,
        left_levels: Vec<S>,
        improvement: f64,
        left: TreeNode,
        right: TreeNode,
    ) -> Self {
        let left_levels = left_levels.into_iter().map(Into::into).collect();
        Self::split(feature_idx, SplitRule::Levels { left: left_levels }, improvement, left, right)
    }

    /// Leaf value reached by one row; `columns` is aligned with the owning
    /// model's feature list
    pub fn predict_row(&self, columns: &[&FeatureColumn], row: usize) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, rule, left, right, .. } => {
                    node = if rule.goes_left(columns[*feature_idx], row) {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Add each split's improvement to its feature's slot
    pub fn accumulate_importance(&self, scores: &mut [f64]) {
        if let TreeNode::Split { feature_idx, improvement, left, right, .. } = self {
            scores[*feature_idx] += *improvement;
            left.accumulate_importance(scores);
            right.accumulate_importance(scores);
        }
    }

    /// Number of split levels on the longest path (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Largest feature index referenced by a split
    pub fn max_feature_idx(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split { feature_idx, left, right, .. } => [
                Some(*feature_idx),
                left.max_feature_idx(),
                right.max_feature_idx(),
            ]
            .into_iter()
            .flatten()
            .max(),
        }
    }

    pub(crate) fn validate(&self, n_features: usize) -> Result<()> {
        match self.max_feature_idx() {
            Some(idx) if idx >= n_features => Err(InsightError::ValidationError(format!(
                "Split references feature index {} but the model has {} features",
                idx, n_features
            ))),
            _ => Ok(()),
        }
    }
}

/// Evaluate every row of `data` against a set of trees sharing one feature
/// list, combining the leaf values with `combine`
pub(crate) fn evaluate_trees<F>(
    trees: &[TreeNode],
    features: &[String],
    data: &Dataset,
    combine: F,
) -> Result<Array1<f64>>
where
    F: Fn(&mut dyn Iterator<Item = f64>) -> f64,
{
    let columns: Vec<FeatureColumn> = features
        .iter()
        .map(|name| data.feature_column(name))
        .collect::<Result<_>>()?;
    let borrowed: Vec<&FeatureColumn> = columns.iter().collect();
    evaluate_columns(trees, &borrowed, data.height(), combine)
}

/// Evaluate `n_rows` rows of already materialized columns, aligned with the
/// trees' feature indices
pub(crate) fn evaluate_columns<F>(
    trees: &[TreeNode],
    columns: &[&FeatureColumn],
    n_rows: usize,
    combine: F,
) -> Result<Array1<f64>>
where
    F: Fn(&mut dyn Iterator<Item = f64>) -> f64,
{
    if let Some(column) = columns.iter().find(|c| c.len() != n_rows) {
        return Err(InsightError::ShapeError {
            expected: format!("{} rows per column", n_rows),
            actual: format!("{}", column.len()),
        });
    }
    if let Some(idx) = trees.iter().filter_map(TreeNode::max_feature_idx).max() {
        if idx >= columns.len() {
            return Err(InsightError::ValidationError(format!(
                "Split references feature index {} but only {} columns were supplied",
                idx,
                columns.len()
            )));
        }
    }

    let predictions: Vec<f64> = (0..n_rows)
        .map(|row| {
            let mut leaves = trees.iter().map(|tree| tree.predict_row(columns, row));
            combine(&mut leaves)
        })
        .collect();

    Ok(Array1::from_vec(predictions))
}

/// A single regression tree; predictions are raw leaf values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeExport")]
pub struct RegressionTree {
    features: Vec<String>,
    root: TreeNode,
}

/// Unchecked wire form of [`RegressionTree`]
#[derive(Deserialize)]
struct TreeExport {
    features: Vec<String>,
    root: TreeNode,
}

impl TryFrom<TreeExport> for RegressionTree {
    type Error = InsightError;

    fn try_from(export: TreeExport) -> Result<Self> {
        Self::new(export.features, export.root)
    }
}

impl RegressionTree {
    pub fn new(features: Vec<String>, root: TreeNode) -> Result<Self> {
        root.validate(features.len())?;
        Ok(Self { features, root })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        evaluate_trees(std::slice::from_ref(&self.root), &self.features, data, |leaves| {
            leaves.next().unwrap_or(f64::NAN)
        })
    }

    /// Sum of split improvements per feature
    pub fn raw_importance(&self) -> Vec<f64> {
        let mut scores = vec![0.0; self.features.len()];
        self.root.accumulate_importance(&mut scores);
        scores
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.root.validate(self.features.len())
    }
}
