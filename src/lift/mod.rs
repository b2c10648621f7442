//! Tariff comparison metrics
//!
//! Provides post-prediction business metrics including:
//! - Poisson and gamma deviance
//! - Loss-ratio lift and double lift over equal-exposure bins
//! - Gini index of the ordered Lorenz curve and minimax model ranking

mod binning;
mod deviance;
mod gini;

pub use binning::{double_lift, exposure_bins, loss_ratio_lift, LiftAnalyzer};
pub use deviance::{gamma_deviance, poisson_deviance, poisson_deviance_with_exposure};
pub use gini::{gini, gini_ranking, GiniRanking, RankedCandidate};

use serde::{Deserialize, Serialize};

/// Column names and defaults for lift analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftConfig {
    /// Observed losses
    pub loss_column: String,
    /// Policy exposure (years at risk)
    pub exposure_column: String,
    /// Default number of equal-exposure bins
    pub n_bins: usize,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            loss_column: "amount".to_string(),
            exposure_column: "expo".to_string(),
            n_bins: 5,
        }
    }
}

impl LiftConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loss_column(mut self, column: impl Into<String>) -> Self {
        self.loss_column = column.into();
        self
    }

    pub fn with_exposure_column(mut self, column: impl Into<String>) -> Self {
        self.exposure_column = column.into();
        self
    }

    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }
}

/// One equal-exposure bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftBin {
    /// `[min, max]` relativity in the bin, 2 decimals
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    /// Summed exposure
    pub exposure: f64,
    pub n_obs: usize,
    /// One value per metric of the table
    pub values: Vec<f64>,
}

/// Bins ordered by ascending relativity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftTable {
    pub benchmark: String,
    pub competitor: String,
    pub metrics: Vec<String>,
    pub bins: Vec<LiftBin>,
}

impl LiftTable {
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Values of one metric across bins
    pub fn metric(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.metrics.iter().position(|m| m == name)?;
        Some(self.bins.iter().map(|b| b.values[idx]).collect())
    }
}
