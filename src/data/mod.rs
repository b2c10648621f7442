//! Named-column datasets used by the interpretation and lift layers
//!
//! A [`Dataset`] wraps a polars `DataFrame`. Columns are either numeric or
//! categorical; string and boolean columns are treated as categorical, every
//! other dtype is cast to `f64`. Datasets are never mutated in place: the
//! override helpers return fresh copies with one or more columns replaced.

mod grid;
mod loader;
mod sampling;

pub use grid::Grid;
pub use loader::{DataLoader, DataSaver, FileInfo};

use crate::error::{InsightError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    /// Numeric payload, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Categorical(_) => None,
        }
    }

    /// Categorical payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Numeric(_) => None,
            FeatureValue::Categorical(s) => Some(s.as_str()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FeatureValue::Numeric(_))
    }

    /// Hashable identity used for unique-combination tables
    pub(crate) fn key(&self) -> ValueKey {
        match self {
            // -0.0 and 0.0 must collapse onto one key
            FeatureValue::Numeric(v) => ValueKey::Numeric((v + 0.0).to_bits()),
            FeatureValue::Categorical(s) => ValueKey::Categorical(s.clone()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{}", v),
            FeatureValue::Categorical(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Categorical(s.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(s: String) -> Self {
        FeatureValue::Categorical(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Numeric(u64),
    Categorical(String),
}

/// A fully materialized column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureColumn {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl FeatureColumn {
    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Numeric(v) => v.len(),
            FeatureColumn::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FeatureColumn::Numeric(_))
    }

    /// Value at `row`; panics when out of bounds, like slice indexing
    pub fn get(&self, row: usize) -> FeatureValue {
        match self {
            FeatureColumn::Numeric(v) => FeatureValue::Numeric(v[row]),
            FeatureColumn::Categorical(v) => FeatureValue::Categorical(v[row].clone()),
        }
    }

    pub(crate) fn key(&self, row: usize) -> ValueKey {
        match self {
            FeatureColumn::Numeric(v) => ValueKey::Numeric((v[row] + 0.0).to_bits()),
            FeatureColumn::Categorical(v) => ValueKey::Categorical(v[row].clone()),
        }
    }

    fn into_polars(self, name: &str) -> Column {
        match self {
            FeatureColumn::Numeric(v) => Column::new(name.into(), v),
            FeatureColumn::Categorical(v) => Column::new(name.into(), v),
        }
    }
}

/// Value domain of a column, used to validate sweep grids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureDomain {
    Numeric { min: f64, max: f64 },
    Categorical { levels: Vec<String> },
}

impl FeatureDomain {
    /// Check that `value` belongs to this domain.
    ///
    /// Numeric domains accept any finite number; values outside the observed
    /// range are extrapolations, not errors. Categorical domains only accept
    /// observed levels.
    pub fn check(&self, feature: &str, value: &FeatureValue) -> Result<()> {
        match (self, value) {
            (FeatureDomain::Numeric { .. }, FeatureValue::Numeric(v)) if v.is_finite() => Ok(()),
            (FeatureDomain::Numeric { .. }, FeatureValue::Numeric(v)) => {
                Err(InsightError::InvalidGridValue {
                    feature: feature.to_string(),
                    value: v.to_string(),
                    reason: "numeric grid values must be finite".to_string(),
                })
            }
            (FeatureDomain::Numeric { .. }, FeatureValue::Categorical(s)) => {
                Err(InsightError::InvalidGridValue {
                    feature: feature.to_string(),
                    value: s.clone(),
                    reason: "feature is numeric".to_string(),
                })
            }
            (FeatureDomain::Categorical { levels }, FeatureValue::Categorical(s)) => {
                if levels.iter().any(|l| l == s) {
                    Ok(())
                } else {
                    Err(InsightError::InvalidGridValue {
                        feature: feature.to_string(),
                        value: s.clone(),
                        reason: "unknown level".to_string(),
                    })
                }
            }
            (FeatureDomain::Categorical { .. }, FeatureValue::Numeric(v)) => {
                Err(InsightError::InvalidGridValue {
                    feature: feature.to_string(),
                    value: v.to_string(),
                    reason: "feature is categorical".to_string(),
                })
            }
        }
    }

    pub fn contains(&self, value: &FeatureValue) -> bool {
        match (self, value) {
            (FeatureDomain::Numeric { min, max }, FeatureValue::Numeric(v)) => *v >= *min && *v <= *max,
            (FeatureDomain::Categorical { levels }, FeatureValue::Categorical(s)) => {
                levels.iter().any(|l| l == s)
            }
            _ => false,
        }
    }
}

/// Ordered rows with named numeric/categorical columns
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Build a dataset from materialized columns
    pub fn from_columns<S: AsRef<str>>(columns: Vec<(S, FeatureColumn)>) -> Result<Self> {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, col)| col.into_polars(name.as_ref()))
            .collect();
        let frame = DataFrame::new(columns)?;
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Fail with `MissingFeature` on the first absent column
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            if !self.has_column(name.as_ref()) {
                return Err(InsightError::MissingFeature(name.as_ref().to_string()));
            }
        }
        Ok(())
    }

    fn series(&self, name: &str) -> Result<&Series> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| InsightError::MissingFeature(name.to_string()))?;
        Ok(column.as_materialized_series())
    }

    /// Whether the column is categorical (string or boolean dtype)
    pub fn is_categorical(&self, name: &str) -> Result<bool> {
        let series = self.series(name)?;
        Ok(matches!(series.dtype(), DataType::String | DataType::Boolean))
    }

    /// Materialize a column; absent columns fail with `MissingFeature`
    pub fn feature_column(&self, name: &str) -> Result<FeatureColumn> {
        if self.is_categorical(name)? {
            self.categorical_column(name).map(FeatureColumn::Categorical)
        } else {
            self.numeric_column(name).map(FeatureColumn::Numeric)
        }
    }

    /// Column as `f64`, nulls become NaN
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let series = self.series(name)?;
        if matches!(series.dtype(), DataType::String | DataType::Boolean) {
            return Err(InsightError::DataError(format!(
                "Column '{}' is categorical, expected numeric",
                name
            )));
        }
        let casted = series.cast(&DataType::Float64)?;
        let values = casted
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(values)
    }

    /// Column as strings, nulls become empty strings
    pub fn categorical_column(&self, name: &str) -> Result<Vec<String>> {
        let series = self.series(name)?;
        let casted = series.cast(&DataType::String)?;
        let values = casted
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect();
        Ok(values)
    }

    /// Single cell
    pub fn value(&self, name: &str, row: usize) -> Result<FeatureValue> {
        if row >= self.height() {
            return Err(InsightError::ValidationError(format!(
                "Row {} out of bounds (height={})",
                row,
                self.height()
            )));
        }
        Ok(self.feature_column(name)?.get(row))
    }

    /// Observed domain of a column
    pub fn domain(&self, name: &str) -> Result<FeatureDomain> {
        match self.feature_column(name)? {
            FeatureColumn::Numeric(values) => {
                let (min, max) = values
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                Ok(FeatureDomain::Numeric { min, max })
            }
            FeatureColumn::Categorical(values) => {
                let mut levels: Vec<String> = Vec::new();
                for v in values {
                    if !levels.contains(&v) {
                        levels.push(v);
                    }
                }
                Ok(FeatureDomain::Categorical { levels })
            }
        }
    }

    /// Copy of the dataset with `column` set to `value` on every row
    pub fn with_override(&self, column: &str, value: &FeatureValue) -> Result<Dataset> {
        self.with_overrides(&[(column, value.clone())])
    }

    /// Copy of the dataset with several columns set to constants
    pub fn with_overrides(&self, overrides: &[(&str, FeatureValue)]) -> Result<Dataset> {
        let n = self.height();
        let mut frame = self.frame.clone();
        for (name, value) in overrides {
            if !self.has_column(name) {
                return Err(InsightError::MissingFeature(name.to_string()));
            }
            let column = match value {
                FeatureValue::Numeric(v) => FeatureColumn::Numeric(vec![*v; n]),
                FeatureValue::Categorical(s) => FeatureColumn::Categorical(vec![s.clone(); n]),
            };
            frame.with_column(column.into_polars(name))?;
        }
        Ok(Dataset { frame })
    }

    /// Subset of rows, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Result<Dataset> {
        let height = self.height();
        if let Some(&bad) = indices.iter().find(|&&i| i >= height) {
            return Err(InsightError::ValidationError(format!(
                "Row {} out of bounds (height={})",
                bad, height
            )));
        }
        let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
        let idx = IdxCa::from_vec("idx".into(), idx);
        let frame = self.frame.take(&idx)?;
        Ok(Dataset { frame })
    }
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Dataset::new(frame)
    }
}
