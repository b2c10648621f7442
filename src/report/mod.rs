//! Tabular export of analysis results
//!
//! Every result type converts to a polars `DataFrame` through
//! [`ToDataFrame`]; frames are written as CSV, whole results as JSON.

use crate::data::{DataSaver, FeatureValue};
use crate::error::Result;
use crate::explainability::{
    EffectCurve, EffectMatrix, GroupedEffectTable, ImportanceRecord, ImportanceTable, InteractionPair,
};
use crate::lift::{GiniRanking, LiftTable};
use polars::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Conversion of a result into a flat table
pub trait ToDataFrame {
    fn to_dataframe(&self) -> Result<DataFrame>;
}

/// Grid values as a Float64 column when all are numeric, else as strings
fn grid_column(name: &str, values: &[FeatureValue]) -> Column {
    if values.iter().all(FeatureValue::is_numeric) {
        let numeric: Vec<f64> = values.iter().filter_map(FeatureValue::as_f64).collect();
        Column::new(name.into(), numeric)
    } else {
        let labels: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Column::new(name.into(), labels)
    }
}

impl ToDataFrame for [ImportanceRecord] {
    fn to_dataframe(&self) -> Result<DataFrame> {
        let variable: Vec<&str> = self.iter().map(|r| r.variable.as_str()).collect();
        let raw: Vec<f64> = self.iter().map(|r| r.raw_score).collect();
        let scaled: Vec<f64> = self.iter().map(|r| r.reported_score()).collect();
        Ok(DataFrame::new(vec![
            Column::new("variable".into(), variable),
            Column::new("raw_score".into(), raw),
            Column::new("scaled_importance".into(), scaled),
        ])?)
    }
}

impl ToDataFrame for ImportanceTable {
    fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new("variable".into(), self.variables.clone())];
        for (m, model) in self.models.iter().enumerate() {
            let scores: Vec<f64> = self.scores.iter().map(|row| row[m]).collect();
            columns.push(Column::new(model.as_str().into(), scores));
        }
        Ok(DataFrame::new(columns)?)
    }
}

impl ToDataFrame for EffectCurve {
    fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            grid_column(&self.feature, &self.grid_values()),
            Column::new("mean_prediction".into(), self.predictions()),
        ])?)
    }
}

/// Long format: one row per (grid value, observation)
impl ToDataFrame for EffectMatrix {
    fn to_dataframe(&self) -> Result<DataFrame> {
        let n_obs = self.n_observations();
        let grid: Vec<FeatureValue> = self
            .grid_values
            .iter()
            .flat_map(|v| std::iter::repeat(v.clone()).take(n_obs))
            .collect();
        let observation: Vec<u32> = (0..self.grid_values.len())
            .flat_map(|_| 0..n_obs as u32)
            .collect();
        let prediction: Vec<f64> = self.predictions.iter().copied().collect();
        Ok(DataFrame::new(vec![
            grid_column(&self.feature, &grid),
            Column::new("observation".into(), observation),
            Column::new("prediction".into(), prediction),
        ])?)
    }
}

/// Long format: one row per (group, grid value)
impl ToDataFrame for GroupedEffectTable {
    fn to_dataframe(&self) -> Result<DataFrame> {
        let n_grid = self.grid_values.len();
        let mut group = Vec::new();
        let mut n_obs = Vec::new();
        let mut grid = Vec::new();
        let mut centered = Vec::new();
        let mut raw = Vec::new();
        for g in &self.groups {
            for k in 0..n_grid {
                group.push(g.label.clone());
                n_obs.push(g.n_obs as u32);
                grid.push(self.grid_values[k].clone());
                centered.push(g.values[k]);
                raw.push(g.raw[k]);
            }
        }
        Ok(DataFrame::new(vec![
            Column::new(self.group_feature.as_str().into(), group),
            Column::new("n_obs".into(), n_obs),
            grid_column(&self.sweep_feature, &grid),
            Column::new("centered".into(), centered),
            Column::new("mean_prediction".into(), raw),
        ])?)
    }
}

impl ToDataFrame for LiftTable {
    fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![
            Column::new(
                "relativity".into(),
                self.bins.iter().map(|b| b.label.clone()).collect::<Vec<_>>(),
            ),
            Column::new("exposure".into(), self.bins.iter().map(|b| b.exposure).collect::<Vec<_>>()),
            Column::new("n_obs".into(), self.bins.iter().map(|b| b.n_obs as u32).collect::<Vec<_>>()),
        ];
        for (m, metric) in self.metrics.iter().enumerate() {
            let values: Vec<f64> = self.bins.iter().map(|b| b.values[m]).collect();
            columns.push(Column::new(metric.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// The Gini matrix with one row per baseline, plus the worst case and rank
impl ToDataFrame for GiniRanking {
    fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new("baseline".into(), self.names.clone())];
        for (s, score) in self.names.iter().enumerate() {
            let values: Vec<f64> = self.matrix.iter().map(|row| row[s]).collect();
            columns.push(Column::new(score.as_str().into(), values));
        }

        let mut worst = vec![f64::NAN; self.names.len()];
        let mut rank = vec![0u32; self.names.len()];
        for (position, candidate) in self.ranking.iter().enumerate() {
            if let Some(i) = self.names.iter().position(|n| n == &candidate.name) {
                worst[i] = candidate.worst_case;
                rank[i] = position as u32 + 1;
            }
        }
        columns.push(Column::new("max_gini".into(), worst));
        columns.push(Column::new("rank".into(), rank));
        Ok(DataFrame::new(columns)?)
    }
}

impl ToDataFrame for [InteractionPair] {
    fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new("first".into(), self.iter().map(|p| p.first.clone()).collect::<Vec<_>>()),
            Column::new("second".into(), self.iter().map(|p| p.second.clone()).collect::<Vec<_>>()),
            Column::new("h".into(), self.iter().map(|p| p.h).collect::<Vec<_>>()),
        ])?)
    }
}

/// Write any result as CSV
pub fn write_csv<T: ToDataFrame + ?Sized>(result: &T, path: &Path) -> Result<()> {
    let mut frame = result.to_dataframe()?;
    DataSaver::save_csv(&mut frame, path)
}

/// Write any serializable result as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(result: &T, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(result)?)?;
    Ok(())
}
