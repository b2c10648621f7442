//! Variable importance extracted from fitted models

use crate::error::{InsightError, Result};
use crate::models::FittedModel;
use crate::utils::stats::round_to;
use serde::{Deserialize, Serialize};

/// Decimal digits used when reporting normalized scores
pub const REPORT_DIGITS: i32 = 4;

/// Importance of one variable in one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRecord {
    pub variable: String,
    pub raw_score: f64,
    /// `raw_score / sum(raw_score)`; sums to 1 over a model's records
    pub normalized_score: f64,
}

impl ImportanceRecord {
    /// Normalized score rounded for reporting
    pub fn reported_score(&self) -> f64 {
        round_to(self.normalized_score, REPORT_DIGITS)
    }
}

/// Normalized importance of every feature with a non-zero raw score,
/// sorted by descending score (ties keep feature order)
pub fn importance(model: &FittedModel) -> Result<Vec<ImportanceRecord>> {
    let raw = model.raw_importance();
    let features = model.features();

    if let Some((name, score)) = features
        .iter()
        .zip(raw.iter())
        .find(|(_, s)| !s.is_finite() || **s < 0.0)
    {
        return Err(InsightError::ValidationError(format!(
            "Raw importance of '{}' must be a non-negative number, got {}",
            name, score
        )));
    }

    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err(InsightError::DegenerateImportance(format!(
            "all {} raw scores of the {} model are zero",
            raw.len(),
            model.kind()
        )));
    }

    let mut records: Vec<ImportanceRecord> = features
        .iter()
        .zip(raw.iter())
        .filter(|(_, score)| **score > 0.0)
        .map(|(name, &score)| ImportanceRecord {
            variable: name.clone(),
            raw_score: score,
            normalized_score: score / total,
        })
        .collect();

    records.sort_by(|a, b| b.normalized_score.total_cmp(&a.normalized_score));
    Ok(records)
}

/// Side-by-side importance of several models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceTable {
    pub models: Vec<String>,
    /// Union of variables, ordered by the first model's ranking, then by
    /// first appearance in later models
    pub variables: Vec<String>,
    /// `scores[v][m]`: normalized score of variable `v` in model `m`
    /// (0 when the model does not use it)
    pub scores: Vec<Vec<f64>>,
}

impl ImportanceTable {
    pub fn build(models: &[(&str, &FittedModel)]) -> Result<Self> {
        let per_model: Vec<Vec<ImportanceRecord>> = models
            .iter()
            .map(|(_, model)| importance(model))
            .collect::<Result<_>>()?;

        let mut variables: Vec<String> = Vec::new();
        for records in &per_model {
            for record in records {
                if !variables.contains(&record.variable) {
                    variables.push(record.variable.clone());
                }
            }
        }

        let scores = variables
            .iter()
            .map(|variable| {
                per_model
                    .iter()
                    .map(|records| {
                        records
                            .iter()
                            .find(|r| &r.variable == variable)
                            .map_or(0.0, |r| r.normalized_score)
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            models: models.iter().map(|(name, _)| name.to_string()).collect(),
            variables,
            scores,
        })
    }
}

/// Importance of several named models side by side
pub fn importance_table(models: &[(&str, &FittedModel)]) -> Result<ImportanceTable> {
    ImportanceTable::build(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoostedEnsemble, Distribution, RandomForest, RegressionTree, TreeNode};

    fn features() -> Vec<String> {
        ["ageph", "bm", "power", "fuel"].iter().map(|s| s.to_string()).collect()
    }

    fn forest() -> FittedModel {
        let trees = vec![
            TreeNode::threshold(
                1,
                4.0,
                30.0,
                TreeNode::threshold(0, 30.0, 10.0, TreeNode::leaf(0.2), TreeNode::leaf(0.1)),
                TreeNode::leaf(0.3),
            ),
            TreeNode::threshold(0, 50.0, 7.0, TreeNode::leaf(0.15), TreeNode::leaf(0.1)),
            TreeNode::threshold(2, 60.0, 3.0, TreeNode::leaf(0.1), TreeNode::leaf(0.2)),
        ];
        RandomForest::new(features(), trees).unwrap().into()
    }

    #[test]
    fn test_normalized_scores_sum_to_one() {
        let records = importance(&forest()).unwrap();
        let total: f64 = records.iter().map(|r| r.normalized_score).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(records.iter().all(|r| r.normalized_score >= 0.0));
    }

    #[test]
    fn test_ranking_and_zero_scores_omitted() {
        let records = importance(&forest()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(names, vec!["bm", "ageph", "power"]);
        assert_eq!(records[0].raw_score, 30.0);
        assert_eq!(records[0].reported_score(), 0.6);
        assert_eq!(records[1].reported_score(), 0.34);
    }

    #[test]
    fn test_all_zero_scores_are_degenerate() {
        let tree = RegressionTree::new(features(), TreeNode::leaf(0.1)).unwrap();
        let err = importance(&tree.into()).unwrap_err();
        assert!(matches!(err, InsightError::DegenerateImportance(_)));
    }

    #[test]
    fn test_boosted_relative_influence() {
        let gbm = BoostedEnsemble::new(
            features(),
            Distribution::Poisson,
            -2.0,
            vec![TreeNode::leaf(0.0)],
            2,
        )
        .unwrap()
        .with_relative_influence(vec![3.0, 1.0, 0.0, 0.0])
        .unwrap();

        let records = importance(&gbm.into()).unwrap();
        assert_eq!(records.len(), 2);
        assert!((records[0].normalized_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_importance_table() {
        let tree: FittedModel = RegressionTree::new(
            features(),
            TreeNode::threshold(3, 0.0, 2.0, TreeNode::leaf(0.1), TreeNode::leaf(0.2)),
        )
        .unwrap()
        .into();
        let forest = forest();

        let table = importance_table(&[("rf", &forest), ("tree", &tree)]).unwrap();
        assert_eq!(table.models, vec!["rf", "tree"]);
        assert_eq!(table.variables, vec!["bm", "ageph", "power", "fuel"]);
        assert_eq!(table.scores[3], vec![0.0, 1.0]);
    }
}
