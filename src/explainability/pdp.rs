//! Partial Dependence Plots and Individual Conditional Expectation

use crate::data::{Dataset, FeatureValue, Grid};
use crate::error::{InsightError, Result};
use crate::models::FittedModel;
use crate::utils::ParallelConfig;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One point of a partial dependence curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPoint {
    pub grid_value: FeatureValue,
    pub mean_prediction: f64,
}

/// Partial dependence curve, in grid order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectCurve {
    pub feature: String,
    pub points: Vec<EffectPoint>,
}

impl EffectCurve {
    pub fn grid_values(&self) -> Vec<FeatureValue> {
        self.points.iter().map(|p| p.grid_value.clone()).collect()
    }

    pub fn predictions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_prediction).collect()
    }
}

/// ICE predictions: one row per grid value, one column per observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectMatrix {
    pub feature: String,
    pub grid_values: Vec<FeatureValue>,
    /// Shape `(n_grid, n_observations)`
    pub predictions: Array2<f64>,
}

impl EffectMatrix {
    pub fn n_observations(&self) -> usize {
        self.predictions.ncols()
    }

    /// The curve of one observation across the grid
    pub fn observation(&self, index: usize) -> Array1<f64> {
        self.predictions.column(index).to_owned()
    }

    /// Average over observations: the partial dependence curve
    pub fn to_curve(&self) -> EffectCurve {
        let means = self
            .predictions
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::from_elem(self.grid_values.len(), f64::NAN));

        EffectCurve {
            feature: self.feature.clone(),
            points: self
                .grid_values
                .iter()
                .zip(means.iter())
                .map(|(value, &mean)| EffectPoint {
                    grid_value: value.clone(),
                    mean_prediction: mean,
                })
                .collect(),
        }
    }

    /// Centered ICE (c-ICE): every observation's curve minus its value at
    /// the first grid point
    pub fn centered(&self) -> EffectMatrix {
        let mut predictions = self.predictions.clone();
        if predictions.nrows() > 0 {
            let first = self.predictions.row(0).to_owned();
            for mut row in predictions.rows_mut() {
                row -= &first;
            }
        }
        EffectMatrix {
            feature: self.feature.clone(),
            grid_values: self.grid_values.clone(),
            predictions,
        }
    }
}

/// Partial dependence calculator for one fitted model
pub struct PartialDependence<'a> {
    model: &'a FittedModel,
    parallel: ParallelConfig,
}

impl<'a> PartialDependence<'a> {
    pub fn new(model: &'a FittedModel) -> Self {
        Self {
            model,
            parallel: ParallelConfig::default(),
        }
    }

    /// Set how grid points are dispatched
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Mean prediction at each grid value
    pub fn curve(&self, data: &Dataset, feature: &str, grid: &Grid) -> Result<EffectCurve> {
        let means = self.sweep(data, feature, grid, |preds| {
            preds.mean().unwrap_or(f64::NAN)
        })?;

        Ok(EffectCurve {
            feature: feature.to_string(),
            points: grid
                .iter()
                .zip(means)
                .map(|(value, mean)| EffectPoint {
                    grid_value: value.clone(),
                    mean_prediction: mean,
                })
                .collect(),
        })
    }

    /// Per-observation predictions at each grid value
    pub fn ice(&self, data: &Dataset, feature: &str, grid: &Grid) -> Result<EffectMatrix> {
        let rows = self.sweep(data, feature, grid, |preds| preds)?;

        let n_obs = data.height();
        let flat: Vec<f64> = rows.into_iter().flat_map(|r| r.into_iter()).collect();
        let predictions = Array2::from_shape_vec((grid.len(), n_obs), flat)?;

        Ok(EffectMatrix {
            feature: feature.to_string(),
            grid_values: grid.values().to_vec(),
            predictions,
        })
    }

    /// Curves for several features
    pub fn curves(&self, data: &Dataset, sweeps: &[(&str, Grid)]) -> Result<Vec<EffectCurve>> {
        sweeps
            .iter()
            .map(|(feature, grid)| self.curve(data, feature, grid))
            .collect()
    }

    /// Predict a copy of `data` with `feature` overridden, once per grid
    /// value, reducing each prediction vector with `reduce`
    pub(crate) fn sweep<T, F>(&self, data: &Dataset, feature: &str, grid: &Grid, reduce: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Array1<f64>) -> T + Send + Sync,
    {
        validate_sweep(self.model, data, feature, grid)?;
        debug!(
            feature,
            grid_points = grid.len(),
            rows = data.height(),
            model = self.model.kind(),
            "Sweeping feature"
        );

        self.parallel.try_map(grid.values(), |value| {
            let swept = data.with_override(feature, value)?;
            Ok(reduce(self.model.predict(&swept)?))
        })
    }
}

/// Checks run before any prediction work: model features present, swept
/// feature present, grid non-empty and compatible with the feature domain
pub(crate) fn validate_sweep(model: &FittedModel, data: &Dataset, feature: &str, grid: &Grid) -> Result<()> {
    data.require_columns(model.features())?;
    if !data.has_column(feature) {
        return Err(InsightError::MissingFeature(feature.to_string()));
    }
    if grid.is_empty() {
        return Err(InsightError::InvalidGridValue {
            feature: feature.to_string(),
            value: "<none>".to_string(),
            reason: "grid is empty".to_string(),
        });
    }

    let domain = data.domain(feature)?;
    for value in grid.iter() {
        domain.check(feature, value)?;
    }
    let outside = grid.iter().filter(|v| !domain.contains(v)).count();
    if outside > 0 {
        warn!(feature, outside, "Grid extends beyond the observed range");
    }
    Ok(())
}

/// Partial dependence of `model` on `feature` over `grid`
pub fn partial_dependence(model: &FittedModel, data: &Dataset, feature: &str, grid: &Grid) -> Result<EffectCurve> {
    PartialDependence::new(model).curve(data, feature, grid)
}

/// ICE curves of `model` on `feature` over `grid`
pub fn individual_conditional_expectation(
    model: &FittedModel,
    data: &Dataset,
    feature: &str,
    grid: &Grid,
) -> Result<EffectMatrix> {
    PartialDependence::new(model).ice(data, feature, grid)
}
