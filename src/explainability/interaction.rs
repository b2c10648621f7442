//! Friedman's H-statistic for interaction strength in boosted ensembles
//!
//! Partial dependence surfaces are evaluated on the link scale at the joint
//! feature combinations observed in the data, weighted by how often each
//! combination occurs. For a feature set `S`, the interaction residual is
//! the inclusion-exclusion sum over all non-empty subsets `A` of `S`,
//! `sum (-1)^(|S|-|A|) PD_A`, so for a pair it reduces to
//! `PD_ij - PD_i - PD_j` after centering.

use crate::data::{Dataset, FeatureColumn, FeatureValue, ValueKey};
use crate::error::{InsightError, Result};
use crate::models::{BoostedEnsemble, FittedModel};
use crate::utils::stats::weighted_mean;
use crate::utils::ParallelConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// H-statistic of one feature pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionPair {
    pub first: String,
    pub second: String,
    /// In `[0, 1]`, or NaN when the ratio is not usable
    pub h: f64,
}

/// Observed joint combinations of the requested features
struct JointTable {
    columns: Vec<FeatureColumn>,
    /// Representative row of each unique combination, first-seen order
    rows: Vec<usize>,
    /// Number of observations sharing each combination
    weights: Vec<f64>,
}

impl JointTable {
    fn build(data: &Dataset, features: &[&str]) -> Result<Self> {
        let columns: Vec<FeatureColumn> = features
            .iter()
            .map(|f| data.feature_column(f))
            .collect::<Result<_>>()?;

        let mut index: HashMap<Vec<ValueKey>, usize> = HashMap::new();
        let mut rows = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        for row in 0..data.height() {
            let key: Vec<ValueKey> = columns.iter().map(|c| c.key(row)).collect();
            match index.get(&key) {
                Some(&u) => weights[u] += 1.0,
                None => {
                    index.insert(key, rows.len());
                    rows.push(row);
                    weights.push(1.0);
                }
            }
        }

        Ok(Self { columns, rows, weights })
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// H-statistic calculator for one boosted ensemble
pub struct InteractionStrength<'a> {
    ensemble: &'a BoostedEnsemble,
    parallel: ParallelConfig,
}

impl<'a> InteractionStrength<'a> {
    /// Only boosted ensembles carry an interaction depth
    pub fn new(model: &'a FittedModel) -> Result<Self> {
        let ensemble = model.as_boosted().ok_or_else(|| {
            InsightError::ValidationError(format!(
                "H-statistic needs a boosted ensemble, got a {} model",
                model.kind()
            ))
        })?;
        Ok(Self {
            ensemble,
            parallel: ParallelConfig::default(),
        })
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// H-statistic of a feature pair
    pub fn pair(&self, data: &Dataset, (first, second): (&str, &str)) -> Result<f64> {
        self.subset(data, &[first, second])
    }

    /// H-statistic of two or more features
    pub fn subset(&self, data: &Dataset, features: &[&str]) -> Result<f64> {
        self.validate(features)?;
        data.require_columns(self.ensemble.features())?;

        let table = JointTable::build(data, features)?;
        if table.len() == 0 {
            return Err(InsightError::ValidationError(
                "H-statistic needs at least one observation".to_string(),
            ));
        }
        debug!(
            features = ?features,
            combinations = table.len(),
            rows = data.height(),
            "Computing H-statistic"
        );

        let model_columns = ModelColumns::build(self.ensemble, data, features)?;

        let k = features.len();
        let full_mask = (1usize << k) - 1;
        let mut residual = vec![0.0; table.len()];
        let mut joint = Vec::new();

        for mask in 1..=full_mask {
            let surface = self.centered_surface(&model_columns, &table, mask)?;
            let sign = if (k - mask.count_ones() as usize) % 2 == 0 { 1.0 } else { -1.0 };
            for (r, s) in residual.iter_mut().zip(surface.iter()) {
                *r += sign * s;
            }
            if mask == full_mask {
                joint = surface;
            }
        }

        let numerator: Vec<f64> = residual.iter().map(|r| r * r).collect();
        let denominator: Vec<f64> = joint.iter().map(|f| f * f).collect();
        Ok(h_from_ratio(
            weighted_mean(&numerator, &table.weights),
            weighted_mean(&denominator, &table.weights),
        ))
    }

    /// H-statistic of every pair of `features`, sorted by descending H with
    /// NaN last
    pub fn matrix(&self, data: &Dataset, features: &[&str]) -> Result<Vec<InteractionPair>> {
        let pairs: Vec<(&str, &str)> = features
            .iter()
            .enumerate()
            .flat_map(|(i, a)| features[i + 1..].iter().map(move |b| (*a, *b)))
            .collect();
        for pair in &pairs {
            self.validate(&[pair.0, pair.1])?;
        }

        let values = self.parallel.try_map(&pairs, |&pair| self.pair(data, pair))?;

        let mut result: Vec<InteractionPair> = pairs
            .into_iter()
            .zip(values)
            .map(|((first, second), h)| InteractionPair {
                first: first.to_string(),
                second: second.to_string(),
                h,
            })
            .collect();
        result.sort_by(|a, b| match (a.h.is_nan(), b.h.is_nan()) {
            (false, false) => b.h.total_cmp(&a.h),
            (x, y) => x.cmp(&y),
        });
        Ok(result)
    }

    fn validate(&self, features: &[&str]) -> Result<()> {
        if features.len() < 2 {
            return Err(InsightError::ValidationError(
                "H-statistic needs at least two features".to_string(),
            ));
        }
        let depth = self.ensemble.interaction_depth();
        if depth < features.len() {
            return Err(InsightError::InsufficientDepth {
                depth,
                requested: features.len(),
            });
        }
        if features.len() >= usize::BITS as usize {
            return Err(InsightError::ValidationError(format!(
                "Too many features for an H-statistic: {}",
                features.len()
            )));
        }
        for (i, feature) in features.iter().enumerate() {
            if !self.ensemble.features().iter().any(|f| f == feature) {
                return Err(InsightError::UnknownFeature(feature.to_string()));
            }
            if features[..i].contains(feature) {
                return Err(InsightError::ValidationError(format!(
                    "Feature '{}' requested twice",
                    feature
                )));
            }
        }
        Ok(())
    }

    /// Partial dependence on the features selected by `mask`, at every
    /// joint combination, minus its weighted mean
    fn centered_surface(&self, model_columns: &ModelColumns, table: &JointTable, mask: usize) -> Result<Vec<f64>> {
        let members: Vec<usize> = (0..table.columns.len()).filter(|b| mask & (1 << b) != 0).collect();

        // Combinations that agree on the selected features share one evaluation
        let mut projections: HashMap<Vec<ValueKey>, usize> = HashMap::new();
        let mut representatives: Vec<usize> = Vec::new();
        let mut projection_of = Vec::with_capacity(table.len());
        for &row in &table.rows {
            let key: Vec<ValueKey> = members.iter().map(|&m| table.columns[m].key(row)).collect();
            let next = representatives.len();
            let p = *projections.entry(key).or_insert(next);
            if p == next {
                representatives.push(row);
            }
            projection_of.push(p);
        }

        let dependence = self.parallel.try_map(&representatives, |&row| {
            let overrides: Vec<(usize, FeatureColumn)> = members
                .iter()
                .map(|&m| (model_columns.positions[m], constant_column(&table.columns[m], row, model_columns.n_rows)))
                .collect();
            let mut columns: Vec<&FeatureColumn> = model_columns.columns.iter().collect();
            for (position, column) in &overrides {
                columns[*position] = column;
            }
            let scores = self.ensemble.predict_link_columns(&columns, model_columns.n_rows)?;
            Ok(scores.mean().unwrap_or(f64::NAN))
        })?;

        let surface: Vec<f64> = projection_of.iter().map(|&p| dependence[p]).collect();
        let center = weighted_mean(&surface, &table.weights);
        Ok(surface.iter().map(|v| v - center).collect())
    }
}

/// The ensemble's feature columns, materialized once per H-statistic
struct ModelColumns {
    columns: Vec<FeatureColumn>,
    /// Position in `columns` of each requested feature
    positions: Vec<usize>,
    n_rows: usize,
}

impl ModelColumns {
    fn build(ensemble: &BoostedEnsemble, data: &Dataset, features: &[&str]) -> Result<Self> {
        let columns = ensemble
            .features()
            .iter()
            .map(|f| data.feature_column(f))
            .collect::<Result<Vec<_>>>()?;
        let positions = features
            .iter()
            .map(|f| {
                ensemble
                    .features()
                    .iter()
                    .position(|name| name == f)
                    .ok_or_else(|| InsightError::UnknownFeature(f.to_string()))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            columns,
            positions,
            n_rows: data.height(),
        })
    }
}

/// Column holding the value of `source` at `row` on every row
fn constant_column(source: &FeatureColumn, row: usize, n_rows: usize) -> FeatureColumn {
    match source.get(row) {
        FeatureValue::Numeric(v) => FeatureColumn::Numeric(vec![v; n_rows]),
        FeatureValue::Categorical(s) => FeatureColumn::Categorical(vec![s; n_rows]),
    }
}

/// `sqrt(numerator / denominator)`; ratios above 1 and a flat joint surface
/// give NaN
fn h_from_ratio(numerator: f64, denominator: f64) -> f64 {
    if !(denominator > 0.0) {
        warn!("Joint partial dependence is flat, H-statistic undefined");
        return f64::NAN;
    }
    let ratio = numerator / denominator;
    if ratio > 1.0 {
        warn!(ratio, "H-statistic ratio above 1, reporting NaN");
        return f64::NAN;
    }
    ratio.sqrt()
}

/// H-statistic of a feature pair of a boosted ensemble
pub fn h_statistic(model: &FittedModel, data: &Dataset, feature_pair: (&str, &str)) -> Result<f64> {
    InteractionStrength::new(model)?.pair(data, feature_pair)
}

/// H-statistic of any set of two or more features
pub fn h_statistic_subset(model: &FittedModel, data: &Dataset, features: &[&str]) -> Result<f64> {
    InteractionStrength::new(model)?.subset(data, features)
}

/// H-statistic of every pair of `features`, strongest first.
///
/// Each pair costs one pass over all rows and active trees per distinct
/// value of either feature and per distinct observed pair, so the work
/// grows with `rows × combinations`; subsample large datasets first (see
/// `AnalysisConfig::interpretation_sample`).
pub fn interaction_matrix(model: &FittedModel, data: &Dataset, features: &[&str]) -> Result<Vec<InteractionPair>> {
    InteractionStrength::new(model)?.matrix(data, features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Distribution, RegressionTree, TreeNode};
    use polars::prelude::*;

    fn features() -> Vec<String> {
        ["ageph", "power", "fuel"].iter().map(|s| s.to_string()).collect()
    }

    fn policies() -> Dataset {
        Dataset::new(
            df!(
                "ageph" => &[20.0, 25.0, 33.0, 41.0, 48.0, 55.0, 62.0, 70.0, 25.0, 48.0],
                "power" => &[40.0, 55.0, 60.0, 75.0, 90.0, 110.0, 50.0, 65.0, 95.0, 45.0],
                "fuel" => &["diesel", "gasoline", "gasoline", "diesel", "gasoline",
                            "diesel", "gasoline", "gasoline", "diesel", "gasoline"]
            )
            .unwrap(),
        )
    }

    /// Every tree splits on a single feature
    fn additive_gbm(depth: usize) -> FittedModel {
        let trees = vec![
            TreeNode::threshold(0, 30.0, 5.0, TreeNode::leaf(0.4), TreeNode::leaf(-0.1)),
            TreeNode::threshold(1, 70.0, 3.0, TreeNode::leaf(-0.2), TreeNode::leaf(0.3)),
            TreeNode::threshold(
                0,
                50.0,
                1.0,
                TreeNode::leaf(0.05),
                TreeNode::threshold(0, 65.0, 0.5, TreeNode::leaf(0.1), TreeNode::leaf(0.2)),
            ),
            TreeNode::levels(2, vec!["diesel"], 1.0, TreeNode::leaf(0.1), TreeNode::leaf(0.0)),
        ];
        BoostedEnsemble::new(features(), Distribution::Poisson, -2.0, trees, depth)
            .unwrap()
            .into()
    }

    fn interacting_gbm() -> FittedModel {
        let trees = vec![
            TreeNode::threshold(0, 30.0, 5.0, TreeNode::leaf(0.4), TreeNode::leaf(-0.1)),
            TreeNode::threshold(
                1,
                70.0,
                3.0,
                TreeNode::leaf(0.0),
                TreeNode::threshold(0, 30.0, 2.0, TreeNode::leaf(0.8), TreeNode::leaf(-0.3)),
            ),
        ];
        BoostedEnsemble::new(features(), Distribution::Poisson, -2.0, trees, 2)
            .unwrap()
            .into()
    }

    #[test]
    fn test_column_override_matches_dataset_override() {
        let model = interacting_gbm();
        let gbm = model.as_boosted().unwrap();
        let data = policies();

        let base = ModelColumns::build(gbm, &data, &["ageph", "fuel"]).unwrap();
        let ageph = constant_column(&data.feature_column("ageph").unwrap(), 0, base.n_rows);
        let fuel = constant_column(&data.feature_column("fuel").unwrap(), 1, base.n_rows);
        let mut columns: Vec<&FeatureColumn> = base.columns.iter().collect();
        columns[base.positions[0]] = &ageph;
        columns[base.positions[1]] = &fuel;

        let in_place = gbm.predict_link_columns(&columns, base.n_rows).unwrap();
        let swept = data
            .with_overrides(&[("ageph", FeatureValue::Numeric(20.0)), ("fuel", FeatureValue::from("gasoline"))])
            .unwrap();
        assert_eq!(in_place, gbm.predict_link(&swept).unwrap());

        assert!(gbm.predict_link_columns(&columns[..1], base.n_rows).is_err());
    }

    #[test]
    fn test_additive_model_has_no_interaction() {
        let h = h_statistic(&additive_gbm(2), &policies(), ("ageph", "power")).unwrap();
        assert!(h.abs() < 1e-6, "h = {}", h);
    }

    #[test]
    fn test_interacting_model_in_unit_interval() {
        let h = h_statistic(&interacting_gbm(), &policies(), ("ageph", "power")).unwrap();
        assert!(h > 0.0 && h <= 1.0, "h = {}", h);
    }

    #[test]
    fn test_pair_is_symmetric() {
        let model = interacting_gbm();
        let data = policies();
        let ab = h_statistic(&model, &data, ("ageph", "power")).unwrap();
        let ba = h_statistic(&model, &data, ("power", "ageph")).unwrap();
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_three_way_on_additive_model() {
        let h = h_statistic_subset(&additive_gbm(3), &policies(), &["ageph", "power", "fuel"]).unwrap();
        assert!(h.abs() < 1e-6);
    }

    #[test]
    fn test_depth_checked_before_feature_names() {
        let shallow = additive_gbm(1);
        let data = policies();
        assert!(matches!(
            h_statistic(&shallow, &data, ("ageph", "region")),
            Err(InsightError::InsufficientDepth { depth: 1, requested: 2 })
        ));
        assert!(matches!(
            h_statistic(&additive_gbm(2), &data, ("ageph", "region")),
            Err(InsightError::UnknownFeature(name)) if name == "region"
        ));
    }

    #[test]
    fn test_non_boosted_model_rejected() {
        let tree: FittedModel = RegressionTree::new(features(), TreeNode::leaf(0.1)).unwrap().into();
        assert!(matches!(
            h_statistic(&tree, &policies(), ("ageph", "power")),
            Err(InsightError::ValidationError(_))
        ));
    }

    #[test]
    fn test_matrix_sorted_descending() {
        let pairs = interaction_matrix(&interacting_gbm(), &policies(), &["ageph", "power", "fuel"]).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!((pairs[0].first.as_str(), pairs[0].second.as_str()), ("ageph", "power"));
        // fuel is never split on
        assert!(pairs[1].h.abs() < 1e-6);
        assert!(pairs[2].h.abs() < 1e-6);
    }

    #[test]
    fn test_ratio_policy() {
        assert!(h_from_ratio(1.0 + 1e-12, 1.0).is_nan());
        assert_eq!(h_from_ratio(1.0, 1.0), 1.0);
        assert_eq!(h_from_ratio(0.25, 1.0), 0.5);
        assert!(h_from_ratio(0.0, 0.0).is_nan());
    }
}
