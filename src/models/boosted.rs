//! Gradient boosting machine representation
//!
//! Trees hold link-scale contributions with the learning rate already
//! applied, so the raw score of a row is `init_score + sum(tree leaves)`.

use super::tree::{evaluate_columns, evaluate_trees, TreeNode};
use crate::data::{Dataset, FeatureColumn};
use crate::error::{InsightError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Response distribution; fixes the link function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Identity link
    Gaussian,
    /// Log link (claim frequency)
    Poisson,
    /// Log link (claim severity)
    Gamma,
    /// Logit link
    Bernoulli,
}

impl Distribution {
    /// Map a link-scale score to the response scale
    pub fn inverse_link(&self, eta: f64) -> f64 {
        match self {
            Distribution::Gaussian => eta,
            Distribution::Poisson | Distribution::Gamma => eta.exp(),
            Distribution::Bernoulli => 1.0 / (1.0 + (-eta).exp()),
        }
    }

    /// Map a response-scale value to the link scale
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Distribution::Gaussian => mu,
            Distribution::Poisson | Distribution::Gamma => mu.ln(),
            Distribution::Bernoulli => (mu / (1.0 - mu)).ln(),
        }
    }
}

/// Additive ensemble of boosted regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnsembleExport")]
pub struct BoostedEnsemble {
    features: Vec<String>,
    distribution: Distribution,
    init_score: f64,
    trees: Vec<TreeNode>,
    /// Ensemble size configured at fit time; only this many leading trees
    /// contribute to predictions
    n_trees: usize,
    /// Maximum interaction depth configured at fit time
    interaction_depth: usize,
    /// Relative influence per feature, if exported by the fitting library
    relative_influence: Option<Vec<f64>>,
}

/// Unchecked wire form of [`BoostedEnsemble`]
#[derive(Deserialize)]
struct EnsembleExport {
    features: Vec<String>,
    distribution: Distribution,
    init_score: f64,
    trees: Vec<TreeNode>,
    n_trees: usize,
    interaction_depth: usize,
    #[serde(default)]
    relative_influence: Option<Vec<f64>>,
}

impl TryFrom<EnsembleExport> for BoostedEnsemble {
    type Error = InsightError;

    fn try_from(export: EnsembleExport) -> Result<Self> {
        let ensemble = Self {
            features: export.features,
            distribution: export.distribution,
            init_score: export.init_score,
            trees: export.trees,
            n_trees: export.n_trees,
            interaction_depth: export.interaction_depth,
            relative_influence: export.relative_influence,
        };
        ensemble.validate()?;
        Ok(ensemble)
    }
}

impl BoostedEnsemble {
    /// Ensemble whose configured size equals the number of trees supplied
    pub fn new(
        features: Vec<String>,
        distribution: Distribution,
        init_score: f64,
        trees: Vec<TreeNode>,
        interaction_depth: usize,
    ) -> Result<Self> {
        let n_trees = trees.len();
        let ensemble = Self {
            features,
            distribution,
            init_score,
            trees,
            n_trees,
            interaction_depth,
            relative_influence: None,
        };
        ensemble.validate()?;
        Ok(ensemble)
    }

    /// Only evaluate the first `n_trees` trees
    pub fn with_n_trees(mut self, n_trees: usize) -> Result<Self> {
        self.n_trees = n_trees;
        self.validate()?;
        Ok(self)
    }

    pub fn with_relative_influence(mut self, influence: Vec<f64>) -> Result<Self> {
        self.relative_influence = Some(influence);
        self.validate()?;
        Ok(self)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }

    pub fn init_score(&self) -> f64 {
        self.init_score
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    pub fn interaction_depth(&self) -> usize {
        self.interaction_depth
    }

    /// The trees that contribute to predictions
    pub fn active_trees(&self) -> &[TreeNode] {
        &self.trees[..self.n_trees.min(self.trees.len())]
    }

    /// Link-scale score of each row
    pub fn predict_link(&self, data: &Dataset) -> Result<Array1<f64>> {
        let init = self.init_score;
        evaluate_trees(self.active_trees(), &self.features, data, |leaves| {
            init + leaves.sum::<f64>()
        })
    }

    /// Link-scale score of `n_rows` rows of materialized columns, one per
    /// entry of [`features`](Self::features)
    pub(crate) fn predict_link_columns(&self, columns: &[&FeatureColumn], n_rows: usize) -> Result<Array1<f64>> {
        if columns.len() != self.features.len() {
            return Err(InsightError::ShapeError {
                expected: format!("{} feature columns", self.features.len()),
                actual: format!("{}", columns.len()),
            });
        }
        let init = self.init_score;
        evaluate_columns(self.active_trees(), columns, n_rows, |leaves| init + leaves.sum::<f64>())
    }

    /// Response-scale prediction of each row
    pub fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        let distribution = self.distribution;
        Ok(self
            .predict_link(data)?
            .mapv(|eta| distribution.inverse_link(eta)))
    }

    /// Stored relative influence, else split improvements summed over the
    /// active trees
    pub fn raw_importance(&self) -> Vec<f64> {
        if let Some(influence) = &self.relative_influence {
            return influence.clone();
        }
        let mut scores = vec![0.0; self.features.len()];
        for tree in self.active_trees() {
            tree.accumulate_importance(&mut scores);
        }
        scores
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_trees > self.trees.len() {
            return Err(InsightError::ValidationError(format!(
                "Configured ensemble size {} exceeds the {} stored trees",
                self.n_trees,
                self.trees.len()
            )));
        }
        if let Some(influence) = &self.relative_influence {
            if influence.len() != self.features.len() {
                return Err(InsightError::ShapeError {
                    expected: format!("{} relative influence values", self.features.len()),
                    actual: format!("{}", influence.len()),
                });
            }
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.features.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn frequency_gbm() -> BoostedEnsemble {
        let trees = vec![
            TreeNode::threshold(0, 30.0, 4.0, TreeNode::leaf(0.2), TreeNode::leaf(-0.1)),
            TreeNode::threshold(1, 5.0, 2.0, TreeNode::leaf(-0.05), TreeNode::leaf(0.15)),
            TreeNode::threshold(0, 60.0, 1.0, TreeNode::leaf(0.0), TreeNode::leaf(0.5)),
        ];
        BoostedEnsemble::new(
            vec!["ageph".to_string(), "bm".to_string()],
            Distribution::Poisson,
            (0.12f64).ln(),
            trees,
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_predict_applies_inverse_link() {
        let gbm = frequency_gbm();
        let data = Dataset::new(df!("ageph" => &[25.0], "bm" => &[10.0]).unwrap());

        let eta = gbm.predict_link(&data).unwrap()[0];
        let expected_eta = (0.12f64).ln() + 0.2 + 0.15 + 0.0;
        assert!((eta - expected_eta).abs() < 1e-12);

        let mu = gbm.predict(&data).unwrap()[0];
        assert!((mu - expected_eta.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_only_configured_trees_contribute() {
        let gbm = frequency_gbm().with_n_trees(2).unwrap();
        let data = Dataset::new(df!("ageph" => &[70.0], "bm" => &[0.0]).unwrap());

        let eta = gbm.predict_link(&data).unwrap()[0];
        // third tree (+0.5 above 60) is beyond the configured size
        let expected = (0.12f64).ln() - 0.1 - 0.05;
        assert!((eta - expected).abs() < 1e-12);
        assert_eq!(gbm.raw_importance(), vec![4.0, 2.0]);
    }

    #[test]
    fn test_configured_size_cannot_exceed_trees() {
        assert!(frequency_gbm().with_n_trees(4).is_err());
    }

    #[test]
    fn test_relative_influence_overrides_improvements() {
        let gbm = frequency_gbm().with_relative_influence(vec![70.0, 30.0]).unwrap();
        assert_eq!(gbm.raw_importance(), vec![70.0, 30.0]);
        assert!(frequency_gbm().with_relative_influence(vec![1.0]).is_err());
    }

    #[test]
    fn test_links_roundtrip() {
        for dist in [
            Distribution::Gaussian,
            Distribution::Poisson,
            Distribution::Gamma,
            Distribution::Bernoulli,
        ] {
            let mu = 0.3;
            assert!((dist.inverse_link(dist.link(mu)) - mu).abs() < 1e-12);
        }
    }
}
