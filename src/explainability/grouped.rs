//! Partial dependence aggregated within groups of a second variable
//!
//! Each observation's ICE curve is assigned to a group by its (unswept)
//! value of the grouping feature. Curves are averaged per group and then
//! centered at the first grid value, so groups can be compared by shape.

use super::pdp::PartialDependence;
use crate::data::{Dataset, FeatureColumn, FeatureValue, Grid};
use crate::error::{InsightError, Result};
use crate::models::FittedModel;
use crate::utils::stats::{format_bound, quantile_sorted};
use crate::utils::ParallelConfig;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One group row of a [`GroupedEffectTable`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectGroup {
    /// `[min, max]` of observed values for numeric bins, the level otherwise
    pub label: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub n_obs: usize,
    /// Centered mean curve; `values[0] == 0.0`
    pub values: Vec<f64>,
    /// Mean curve before centering
    pub raw: Vec<f64>,
}

/// Group rows × grid columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedEffectTable {
    pub sweep_feature: String,
    pub group_feature: String,
    pub grid_values: Vec<FeatureValue>,
    pub groups: Vec<EffectGroup>,
}

impl GroupedEffectTable {
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.label.as_str()).collect()
    }
}

/// Assignment of observations to groups
struct Grouping {
    /// Group index per row; `None` for rows with a missing group value
    assignment: Vec<Option<usize>>,
    labels: Vec<(String, Option<f64>, Option<f64>)>,
}

/// Grouped, centered partial dependence.
///
/// With `n_groups = Some(n)` the numeric `group_feature` is cut at its
/// empirical quantiles into at most `n` bins; duplicate boundaries collapse
/// and empty bins are dropped. With `None`, every distinct value of
/// `group_feature` (categorical levels in first-seen order, numeric values
/// ascending) is its own group.
pub fn grouped_partial_dependence(
    model: &FittedModel,
    data: &Dataset,
    sweep_feature: &str,
    grid: &Grid,
    group_feature: &str,
    n_groups: Option<usize>,
) -> Result<GroupedEffectTable> {
    GroupedPartialDependence::new(model).compute(data, sweep_feature, grid, group_feature, n_groups)
}

/// Grouped partial dependence calculator
pub struct GroupedPartialDependence<'a> {
    engine: PartialDependence<'a>,
}

impl<'a> GroupedPartialDependence<'a> {
    pub fn new(model: &'a FittedModel) -> Self {
        Self {
            engine: PartialDependence::new(model),
        }
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.engine = self.engine.with_parallel(parallel);
        self
    }

    pub fn compute(
        &self,
        data: &Dataset,
        sweep_feature: &str,
        grid: &Grid,
        group_feature: &str,
        n_groups: Option<usize>,
    ) -> Result<GroupedEffectTable> {
        if n_groups == Some(0) {
            return Err(InsightError::ValidationError(
                "n_groups must be at least 1".to_string(),
            ));
        }
        let grouping = build_grouping(data, group_feature, n_groups)?;

        let grid = grid.sorted();
        let ice = self.engine.ice(data, sweep_feature, &grid)?;
        debug!(
            sweep_feature,
            group_feature,
            groups = grouping.labels.len(),
            "Aggregating ICE curves by group"
        );

        let groups = aggregate(&ice.predictions, grouping);

        Ok(GroupedEffectTable {
            sweep_feature: sweep_feature.to_string(),
            group_feature: group_feature.to_string(),
            grid_values: ice.grid_values,
            groups,
        })
    }
}

/// Column-wise mean within each group, then centering at the first column
fn aggregate(predictions: &Array2<f64>, grouping: Grouping) -> Vec<EffectGroup> {
    let n_grid = predictions.nrows();
    let n_groups = grouping.labels.len();
    let mut sums = vec![vec![0.0; n_grid]; n_groups];
    let mut counts = vec![0usize; n_groups];

    for (obs, group) in grouping.assignment.iter().enumerate() {
        let Some(group) = *group else { continue };
        counts[group] += 1;
        for (g, sum) in sums[group].iter_mut().enumerate() {
            *sum += predictions[[g, obs]];
        }
    }

    grouping
        .labels
        .into_iter()
        .zip(sums.into_iter().zip(counts))
        .filter(|(_, (_, count))| *count > 0)
        .map(|((label, lower, upper), (sum, count))| {
            let raw: Vec<f64> = sum.iter().map(|s| s / count as f64).collect();
            let first = raw.first().copied().unwrap_or(0.0);
            let values = raw.iter().map(|v| v - first).collect();
            EffectGroup {
                label,
                lower,
                upper,
                n_obs: count,
                values,
                raw,
            }
        })
        .collect()
}

fn build_grouping(data: &Dataset, group_feature: &str, n_groups: Option<usize>) -> Result<Grouping> {
    match (data.feature_column(group_feature)?, n_groups) {
        (FeatureColumn::Numeric(values), Some(n)) => Ok(quantile_grouping(&values, n)),
        (FeatureColumn::Numeric(values), None) => Ok(distinct_numeric_grouping(&values)),
        (FeatureColumn::Categorical(_), Some(_)) => Err(InsightError::ValidationError(format!(
            "'{}' is categorical and cannot be cut into quantile bins",
            group_feature
        ))),
        (FeatureColumn::Categorical(levels), None) => Ok(level_grouping(&levels)),
    }
}

fn level_grouping(values: &[String]) -> Grouping {
    let mut labels: Vec<(String, Option<f64>, Option<f64>)> = Vec::new();
    let assignment = values
        .iter()
        .map(|value| {
            let idx = match labels.iter().position(|(l, _, _)| l == value) {
                Some(idx) => idx,
                None => {
                    labels.push((value.clone(), None, None));
                    labels.len() - 1
                }
            };
            Some(idx)
        })
        .collect();
    Grouping { assignment, labels }
}

fn distinct_numeric_grouping(values: &[f64]) -> Grouping {
    let mut distinct: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    let assignment = values
        .iter()
        .map(|v| {
            if v.is_finite() {
                distinct.binary_search_by(|d| d.total_cmp(v)).ok()
            } else {
                None
            }
        })
        .collect();
    let labels = distinct
        .iter()
        .map(|&v| (format_bound(v), Some(v), Some(v)))
        .collect();
    Grouping { assignment, labels }
}

/// Bins at type-7 quantiles `k / n`; the lowest bin is closed, later bins
/// are `(lo, hi]`
fn quantile_grouping(values: &[f64], n: usize) -> Grouping {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Grouping {
            assignment: vec![None; values.len()],
            labels: Vec::new(),
        };
    }
    sorted.sort_by(f64::total_cmp);

    let mut boundaries: Vec<f64> = (0..=n)
        .map(|k| quantile_sorted(&sorted, k as f64 / n as f64))
        .collect();
    boundaries.dedup();
    let n_bins = boundaries.len().saturating_sub(1).max(1);

    let bin_of = |v: f64| -> usize {
        boundaries[1..]
            .iter()
            .position(|&hi| v <= hi)
            .unwrap_or(n_bins - 1)
            .min(n_bins - 1)
    };

    let assignment: Vec<Option<usize>> = values
        .iter()
        .map(|&v| if v.is_finite() { Some(bin_of(v)) } else { None })
        .collect();

    let mut ranges = vec![(f64::INFINITY, f64::NEG_INFINITY); n_bins];
    for (&v, bin) in values.iter().zip(assignment.iter()) {
        if let Some(bin) = *bin {
            let (lo, hi) = &mut ranges[bin];
            *lo = lo.min(v);
            *hi = hi.max(v);
        }
    }

    // Empty bins keep an inverted range and are dropped during aggregation
    let labels = ranges
        .into_iter()
        .map(|(lo, hi)| {
            if lo <= hi {
                (format!("[{}, {}]", format_bound(lo), format_bound(hi)), Some(lo), Some(hi))
            } else {
                (String::new(), None, None)
            }
        })
        .collect();

    Grouping { assignment, labels }
}
