//! Sweep grids for partial dependence

use super::{Dataset, FeatureColumn, FeatureValue};
use crate::error::{InsightError, Result};
use crate::utils::stats::quantile_sorted;
use serde::{Deserialize, Serialize};

/// Ordered candidate values for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    values: Vec<FeatureValue>,
}

impl Grid {
    pub fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }

    pub fn numeric<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self {
            values: values.into_iter().map(FeatureValue::Numeric).collect(),
        }
    }

    pub fn categorical<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: levels
                .into_iter()
                .map(|l| FeatureValue::Categorical(l.into()))
                .collect(),
        }
    }

    /// Inclusive arithmetic sequence `from, from + step, ..., <= to`
    pub fn sequence(from: f64, to: f64, step: f64) -> Result<Self> {
        if !(step > 0.0) || !from.is_finite() || !to.is_finite() || to < from {
            return Err(InsightError::ValidationError(format!(
                "Invalid sequence {}..={} by {}",
                from, to, step
            )));
        }
        // tolerance keeps 0.1-style steps from dropping the end point
        let n = ((to - from) / step + 1e-9).floor() as usize + 1;
        Ok(Self::numeric((0..n).map(|i| from + i as f64 * step)))
    }

    /// Evenly spaced grid between two percentiles of the observed values
    pub fn evenly_spaced(
        data: &Dataset,
        feature: &str,
        n_points: usize,
        percentile_range: (f64, f64),
    ) -> Result<Self> {
        let sorted = sorted_finite(data, feature)?;
        let n_points = n_points.max(2);
        let (low_pct, high_pct) = percentile_range;
        let low = quantile_sorted(&sorted, low_pct.clamp(0.0, 100.0) / 100.0);
        let high = quantile_sorted(&sorted, high_pct.clamp(0.0, 100.0) / 100.0);

        if high <= low {
            return Ok(Self::numeric([low]));
        }
        let step = (high - low) / (n_points - 1) as f64;
        Ok(Self::numeric((0..n_points).map(|i| low + i as f64 * step)))
    }

    /// Empirical quantiles at `k / (n - 1)`, duplicates removed
    pub fn quantiles(data: &Dataset, feature: &str, n_points: usize) -> Result<Self> {
        let sorted = sorted_finite(data, feature)?;
        let n_points = n_points.max(2);
        let mut values: Vec<f64> = (0..n_points)
            .map(|k| quantile_sorted(&sorted, k as f64 / (n_points - 1) as f64))
            .collect();
        values.dedup();
        Ok(Self::numeric(values))
    }

    /// Every distinct observed value: ascending for numeric columns,
    /// first-seen order for categorical ones
    pub fn observed(data: &Dataset, feature: &str) -> Result<Self> {
        match data.feature_column(feature)? {
            FeatureColumn::Numeric(_) => {
                let mut sorted = sorted_finite(data, feature)?;
                sorted.dedup();
                Ok(Self::numeric(sorted))
            }
            FeatureColumn::Categorical(_) => Self::levels(data, feature),
        }
    }

    /// Categorical levels in first-seen order
    pub fn levels(data: &Dataset, feature: &str) -> Result<Self> {
        let values = data.categorical_column(feature)?;
        let mut levels: Vec<String> = Vec::new();
        for v in values {
            if !levels.contains(&v) {
                levels.push(v);
            }
        }
        Ok(Self::categorical(levels))
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureValue> {
        self.values.iter()
    }

    /// Numeric grids sorted ascending; grids holding any categorical value
    /// keep the caller's order
    pub fn sorted(&self) -> Grid {
        if self.values.iter().all(FeatureValue::is_numeric) {
            let mut values = self.values.clone();
            values.sort_by(|a, b| {
                let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                a.total_cmp(&b)
            });
            Grid { values }
        } else {
            self.clone()
        }
    }
}

fn sorted_finite(data: &Dataset, feature: &str) -> Result<Vec<f64>> {
    let mut values: Vec<f64> = data
        .numeric_column(feature)?
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return Err(InsightError::DataError(format!(
            "Column '{}' has no finite values",
            feature
        )));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(values)
}
