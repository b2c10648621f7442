//! Equal-exposure binning, loss-ratio lift and double lift

use super::{LiftBin, LiftConfig, LiftTable};
use crate::data::Dataset;
use crate::error::{InsightError, Result};
use crate::utils::stats::mean;
use tracing::{debug, warn};

/// Tolerance applied before taking the ceiling of a cumulative share, so
/// that a row ending exactly on a boundary stays in the lower bin
const BOUNDARY_EPS: f64 = 1e-9;

/// Sort rows by `key` (stable, ascending) and cut them into `n_bins`
/// groups of equal cumulative exposure.
///
/// A row whose inclusive cumulative exposure is `C` goes to bin
/// `ceil(C * n_bins / total) - 1`. Returns row indices per non-empty bin,
/// in ascending key order.
pub fn exposure_bins(key: &[f64], exposure: &[f64], n_bins: usize) -> Result<Vec<Vec<usize>>> {
    if n_bins == 0 {
        return Err(InsightError::ValidationError("n_bins must be at least 1".to_string()));
    }
    if key.len() != exposure.len() {
        return Err(InsightError::ShapeError {
            expected: format!("{} exposures", key.len()),
            actual: format!("{}", exposure.len()),
        });
    }
    if let Some(i) = exposure.iter().position(|e| !(e.is_finite() && *e >= 0.0)) {
        return Err(InsightError::ValidationError(format!(
            "Exposure must be non-negative, got {} at row {}",
            exposure[i], i
        )));
    }
    if let Some(i) = key.iter().position(|k| !k.is_finite()) {
        return Err(InsightError::ValidationError(format!(
            "Sort key must be finite, got {} at row {}",
            key[i], i
        )));
    }
    let total: f64 = exposure.iter().sum();
    if total <= 0.0 {
        return Err(InsightError::ValidationError(
            "Total exposure must be positive".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..key.len()).collect();
    order.sort_by(|&a, &b| key[a].total_cmp(&key[b]));

    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); n_bins];
    let mut cumulative = 0.0;
    for row in order {
        cumulative += exposure[row];
        let share = cumulative * n_bins as f64 / total;
        let bin = ((share - BOUNDARY_EPS).ceil() as i64 - 1).clamp(0, n_bins as i64 - 1) as usize;
        bins[bin].push(row);
    }
    bins.retain(|b| !b.is_empty());
    Ok(bins)
}

/// Columns gathered once per lift analysis
struct LiftColumns {
    benchmark: Vec<f64>,
    competitor: Vec<f64>,
    loss: Vec<f64>,
    exposure: Vec<f64>,
    relativity: Vec<f64>,
}

/// Lift and Gini analyses over a scored test set
#[derive(Debug, Clone, Default)]
pub struct LiftAnalyzer {
    config: LiftConfig,
}

impl LiftAnalyzer {
    pub fn new(config: LiftConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LiftConfig {
        &self.config
    }

    /// Per bin: `sum(loss) / sum(benchmark premium)`
    pub fn loss_ratio_lift(
        &self,
        data: &Dataset,
        benchmark: &str,
        competitor: &str,
        n_bins: usize,
    ) -> Result<LiftTable> {
        let columns = self.columns(data, benchmark, competitor)?;
        self.table(&columns, benchmark, competitor, n_bins, vec!["loss_ratio".to_string()], |rows| {
            let loss: f64 = rows.iter().map(|&r| columns.loss[r]).sum();
            let premium: f64 = rows.iter().map(|&r| columns.benchmark[r]).sum();
            vec![loss / premium]
        })
    }

    /// Per bin: percentage error of each premium against the observed loss,
    /// `mean(premium) / mean(loss) - 1`, competitor first. A bin without
    /// losses reports NaN for both.
    pub fn double_lift(&self, data: &Dataset, benchmark: &str, competitor: &str, n_bins: usize) -> Result<LiftTable> {
        let columns = self.columns(data, benchmark, competitor)?;
        let metrics = vec![format!("{}_error", competitor), format!("{}_error", benchmark)];
        self.table(&columns, benchmark, competitor, n_bins, metrics, |rows| {
            let pick = |values: &[f64]| -> Vec<f64> { rows.iter().map(|&r| values[r]).collect() };
            let loss = mean(&pick(&columns.loss));
            if loss <= 0.0 {
                warn!(rows = rows.len(), "Bin without losses, double lift error undefined");
                return vec![f64::NAN, f64::NAN];
            }
            vec![
                mean(&pick(&columns.competitor)) / loss - 1.0,
                mean(&pick(&columns.benchmark)) / loss - 1.0,
            ]
        })
    }

    /// Gini ranking of premium columns against the configured loss column
    pub fn gini_ranking(&self, data: &Dataset, premium_columns: &[&str]) -> Result<super::GiniRanking> {
        let loss = data.numeric_column(&self.config.loss_column)?;
        let premiums: Vec<Vec<f64>> = premium_columns
            .iter()
            .map(|c| data.numeric_column(c))
            .collect::<Result<_>>()?;
        let named: Vec<(&str, &[f64])> = premium_columns
            .iter()
            .zip(premiums.iter())
            .map(|(name, values)| (*name, values.as_slice()))
            .collect();
        super::gini_ranking(&loss, &named)
    }

    fn columns(&self, data: &Dataset, benchmark: &str, competitor: &str) -> Result<LiftColumns> {
        data.require_columns(&[
            benchmark,
            competitor,
            self.config.loss_column.as_str(),
            self.config.exposure_column.as_str(),
        ])?;
        let benchmark_values = data.numeric_column(benchmark)?;
        let competitor_values = data.numeric_column(competitor)?;

        if let Some(i) = benchmark_values.iter().position(|p| !(p.is_finite() && *p > 0.0)) {
            return Err(InsightError::ValidationError(format!(
                "Benchmark premium '{}' must be positive, got {} at row {}",
                benchmark, benchmark_values[i], i
            )));
        }
        let loss = data.numeric_column(&self.config.loss_column)?;
        if let Some(i) = loss.iter().position(|l| !(l.is_finite() && *l >= 0.0)) {
            return Err(InsightError::ValidationError(format!(
                "Losses in '{}' must be non-negative, got {} at row {}",
                self.config.loss_column, loss[i], i
            )));
        }
        let relativity = competitor_values
            .iter()
            .zip(benchmark_values.iter())
            .map(|(c, b)| c / b)
            .collect();

        Ok(LiftColumns {
            loss,
            exposure: data.numeric_column(&self.config.exposure_column)?,
            benchmark: benchmark_values,
            competitor: competitor_values,
            relativity,
        })
    }

    fn table<F>(
        &self,
        columns: &LiftColumns,
        benchmark: &str,
        competitor: &str,
        n_bins: usize,
        metrics: Vec<String>,
        metric: F,
    ) -> Result<LiftTable>
    where
        F: Fn(&[usize]) -> Vec<f64>,
    {
        let bins = exposure_bins(&columns.relativity, &columns.exposure, n_bins)?;
        debug!(benchmark, competitor, requested = n_bins, bins = bins.len(), "Binned by relativity");

        let bins = bins
            .iter()
            .map(|rows| {
                let (lower, upper) = rows
                    .iter()
                    .map(|&r| columns.relativity[r])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(r), hi.max(r)));
                LiftBin {
                    label: format!("[{:.2}, {:.2}]", lower, upper),
                    lower,
                    upper,
                    exposure: rows.iter().map(|&r| columns.exposure[r]).sum(),
                    n_obs: rows.len(),
                    values: metric(rows),
                }
            })
            .collect();

        Ok(LiftTable {
            benchmark: benchmark.to_string(),
            competitor: competitor.to_string(),
            metrics,
            bins,
        })
    }
}

/// Loss-ratio lift with the default loss (`amount`) and exposure (`expo`)
/// columns
pub fn loss_ratio_lift(data: &Dataset, benchmark: &str, competitor: &str, n_bins: usize) -> Result<LiftTable> {
    LiftAnalyzer::default().loss_ratio_lift(data, benchmark, competitor, n_bins)
}

/// Double lift with the default loss and exposure columns
pub fn double_lift(data: &Dataset, benchmark: &str, competitor: &str, n_bins: usize) -> Result<LiftTable> {
    LiftAnalyzer::default().double_lift(data, benchmark, competitor, n_bins)
}
