//! Gini index of the ordered Lorenz curve and minimax model selection
//!
//! For a score and a baseline premium, policies are sorted by relativity
//! `score / baseline`. The ordered Lorenz curve plots the cumulative share
//! of baseline premium against the cumulative share of losses; the Gini
//! index is twice the area between the curve and the line of equality.
//! A large Gini means the score finds profitable segments the baseline
//! misprices.

use crate::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gini index of `score` against `baseline`, as a fraction in `[-1, 1]`
pub fn gini(loss: &[f64], score: &[f64], baseline: &[f64]) -> Result<f64> {
    if loss.len() != score.len() || loss.len() != baseline.len() {
        return Err(InsightError::ShapeError {
            expected: format!("{} premiums", loss.len()),
            actual: format!("{} scores and {} baseline premiums", score.len(), baseline.len()),
        });
    }
    if loss.is_empty() {
        return Err(InsightError::ValidationError(
            "Gini index needs at least one policy".to_string(),
        ));
    }
    if let Some(i) = baseline.iter().position(|p| !(p.is_finite() && *p > 0.0)) {
        return Err(InsightError::ValidationError(format!(
            "Baseline premium must be positive, got {} at row {}",
            baseline[i], i
        )));
    }
    if let Some(i) = loss.iter().position(|l| !(l.is_finite() && *l >= 0.0)) {
        return Err(InsightError::ValidationError(format!(
            "Losses must be non-negative, got {} at row {}",
            loss[i], i
        )));
    }
    let total_loss: f64 = loss.iter().sum();
    if total_loss <= 0.0 {
        return Err(InsightError::ValidationError(
            "Total loss must be positive".to_string(),
        ));
    }
    let total_premium: f64 = baseline.iter().sum();

    let relativity: Vec<f64> = score.iter().zip(baseline).map(|(s, b)| s / b).collect();
    let mut order: Vec<usize> = (0..loss.len()).collect();
    order.sort_by(|&a, &b| relativity[a].total_cmp(&relativity[b]));

    let (mut x, mut y, mut area) = (0.0, 0.0, 0.0);
    for row in order {
        let next_x = x + baseline[row] / total_premium;
        let next_y = y + loss[row] / total_loss;
        area += (next_x - x) * (next_y + y) / 2.0;
        x = next_x;
        y = next_y;
    }

    Ok(1.0 - 2.0 * area)
}

/// A premium column's place in the minimax ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub name: String,
    /// Largest Gini any other score achieves against this candidate
    pub worst_case: f64,
}

/// Gini matrix over premium columns and the minimax ranking derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiniRanking {
    /// Premium columns in input order
    pub names: Vec<String>,
    /// `matrix[b][s]`: Gini of score `s` with column `b` as baseline;
    /// the diagonal is 0
    pub matrix: Vec<Vec<f64>>,
    /// Best (smallest worst case) first; ties keep input order
    pub ranking: Vec<RankedCandidate>,
}

impl GiniRanking {
    /// The minimax choice
    pub fn best(&self) -> Option<&RankedCandidate> {
        self.ranking.first()
    }
}

/// Rank premium columns by their worst-case Gini when used as baseline
/// against every other column
pub fn gini_ranking(loss: &[f64], premiums: &[(&str, &[f64])]) -> Result<GiniRanking> {
    if premiums.len() < 2 {
        return Err(InsightError::ValidationError(format!(
            "Gini ranking needs at least two premium columns, got {}",
            premiums.len()
        )));
    }

    let n = premiums.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for (b, (_, baseline)) in premiums.iter().enumerate() {
        for (s, (_, score)) in premiums.iter().enumerate() {
            if b != s {
                matrix[b][s] = gini(loss, score, baseline)?;
            }
        }
    }

    let mut ranking: Vec<RankedCandidate> = premiums
        .iter()
        .zip(matrix.iter())
        .map(|((name, _), row)| RankedCandidate {
            name: name.to_string(),
            worst_case: row.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect();
    ranking.sort_by(|a, b| a.worst_case.total_cmp(&b.worst_case));
    debug!(candidates = n, best = %ranking[0].name, "Ranked premiums by worst-case Gini");

    Ok(GiniRanking {
        names: premiums.iter().map(|(name, _)| name.to_string()).collect(),
        matrix,
        ranking,
    })
}
