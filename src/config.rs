//! Analysis configuration

use crate::data::{Dataset, Grid};
use crate::error::Result;
use crate::lift::LiftConfig;
use crate::utils::ParallelConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default sweep grids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdpConfig {
    /// Points of an automatically built numeric grid
    pub grid_points: usize,
    /// Percentiles (0-100) bounding an automatic numeric grid
    pub percentile_range: (f64, f64),
    /// Quantile bins for grouped partial dependence on a numeric feature
    pub n_groups: Option<usize>,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            grid_points: 50,
            percentile_range: (5.0, 95.0),
            n_groups: Some(5),
        }
    }
}

impl PdpConfig {
    pub fn with_grid_points(mut self, n: usize) -> Self {
        self.grid_points = n.max(2);
        self
    }

    pub fn with_percentile_range(mut self, low: f64, high: f64) -> Self {
        self.percentile_range = (low.clamp(0.0, 100.0), high.clamp(0.0, 100.0));
        self
    }

    pub fn with_n_groups(mut self, n_groups: Option<usize>) -> Self {
        self.n_groups = n_groups;
        self
    }

    /// Levels of a categorical feature, else an evenly spaced grid between
    /// the configured percentiles
    pub fn grid_for(&self, data: &Dataset, feature: &str) -> Result<Grid> {
        if data.is_categorical(feature)? {
            Grid::levels(data, feature)
        } else {
            Grid::evenly_spaced(data, feature, self.grid_points, self.percentile_range)
        }
    }
}

/// Settings shared by every analysis of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Seed of the interpretation subsample
    pub seed: u64,
    /// Rows kept for interpretation (None = all)
    pub sample_size: Option<usize>,
    pub pdp: PdpConfig,
    pub lift: LiftConfig,
    pub parallel: ParallelConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 54321,
            sample_size: Some(10_000),
            pdp: PdpConfig::default(),
            lift: LiftConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sample_size(mut self, sample_size: Option<usize>) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_pdp(mut self, pdp: PdpConfig) -> Self {
        self.pdp = pdp;
        self
    }

    pub fn with_lift(mut self, lift: LiftConfig) -> Self {
        self.lift = lift;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Missing keys take their default values
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Seeded subsample of `data` for interpretation, or all of it
    pub fn interpretation_sample(&self, data: &Dataset) -> Result<Dataset> {
        match self.sample_size {
            Some(n) if n < data.height() => data.sample(n, self.seed),
            _ => Ok(data.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.lift.loss_column, "amount");
        assert_eq!(config.lift.exposure_column, "expo");
        assert_eq!(config.pdp.grid_points, 50);
        assert!(config.parallel.enabled);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"seed": 7, "lift": {"n_bins": 10}}"#).unwrap();

        let config = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.lift.n_bins, 10);
        assert_eq!(config.lift.loss_column, "amount");
        assert_eq!(config.sample_size, Some(10_000));
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AnalysisConfig::new()
            .with_seed(1)
            .with_sample_size(None)
            .with_pdp(PdpConfig::default().with_grid_points(20))
            .with_parallel(ParallelConfig::sequential());
        config.to_json_file(&path).unwrap();
        assert_eq!(AnalysisConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_grid_for_column_kind() {
        let data = Dataset::new(
            df!(
                "ageph" => &[20.0, 30.0, 40.0, 50.0, 60.0],
                "fuel" => &["diesel", "gasoline", "diesel", "diesel", "gasoline"]
            )
            .unwrap(),
        );
        let pdp = PdpConfig::default().with_grid_points(5).with_percentile_range(0.0, 100.0);
        assert_eq!(pdp.grid_for(&data, "ageph").unwrap(), Grid::numeric([20.0, 30.0, 40.0, 50.0, 60.0]));
        assert_eq!(pdp.grid_for(&data, "fuel").unwrap(), Grid::categorical(["diesel", "gasoline"]));
    }

    #[test]
    fn test_interpretation_sample() {
        let data = Dataset::new(df!("x" => (0..20).map(|i| i as f64).collect::<Vec<_>>()).unwrap());
        let config = AnalysisConfig::new().with_sample_size(Some(5));
        let a = config.interpretation_sample(&data).unwrap();
        let b = config.interpretation_sample(&data).unwrap();
        assert_eq!(a.height(), 5);
        assert_eq!(a.numeric_column("x").unwrap(), b.numeric_column("x").unwrap());
    }
}
