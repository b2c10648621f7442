//! Out-of-sample deviance for frequency and severity models

use crate::error::{InsightError, Result};
use ndarray::Array1;

fn check_lengths(observed: &Array1<f64>, predicted: &Array1<f64>) -> Result<()> {
    if observed.len() != predicted.len() {
        return Err(InsightError::ShapeError {
            expected: format!("{} predictions", observed.len()),
            actual: format!("{}", predicted.len()),
        });
    }
    if observed.is_empty() {
        return Err(InsightError::ValidationError(
            "Deviance needs at least one observation".to_string(),
        ));
    }
    Ok(())
}

fn check_positive(name: &str, values: &Array1<f64>) -> Result<()> {
    match values.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
        Some(i) => Err(InsightError::ValidationError(format!(
            "{} must be positive, got {} at row {}",
            name, values[i], i
        ))),
        None => Ok(()),
    }
}

fn check_non_negative(name: &str, values: &Array1<f64>) -> Result<()> {
    match values.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
        Some(i) => Err(InsightError::ValidationError(format!(
            "{} must be non-negative, got {} at row {}",
            name, values[i], i
        ))),
        None => Ok(()),
    }
}

/// Unit Poisson deviance `-2 (log p(y | mu) - log p(y | y))`.
///
/// The factorial terms cancel, leaving `2 (y ln(y / mu) - (y - mu))`; an
/// observed count of zero contributes nothing to the saturated term.
fn poisson_unit_deviance(y: f64, mu: f64) -> f64 {
    if y == 0.0 {
        2.0 * mu
    } else {
        2.0 * (y * (y / mu).ln() - (y - mu))
    }
}

/// Mean Poisson deviance of observed counts against predicted means
pub fn poisson_deviance(observed: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64> {
    check_lengths(observed, predicted)?;
    check_non_negative("Observed counts", observed)?;
    check_positive("Predicted rates", predicted)?;

    let total: f64 = observed
        .iter()
        .zip(predicted.iter())
        .map(|(&y, &mu)| poisson_unit_deviance(y, mu))
        .sum();
    Ok(total / observed.len() as f64)
}

/// Mean Poisson deviance with predicted annual rates scaled by exposure
pub fn poisson_deviance_with_exposure(
    counts: &Array1<f64>,
    rates: &Array1<f64>,
    exposure: &Array1<f64>,
) -> Result<f64> {
    check_lengths(counts, exposure)?;
    check_lengths(counts, rates)?;
    check_positive("Exposure", exposure)?;
    poisson_deviance(counts, &(rates * exposure))
}

/// Mean weighted gamma deviance `-2 w (ln(y / mu) - (y - mu) / mu)`
pub fn gamma_deviance(observed: &Array1<f64>, predicted: &Array1<f64>, weights: &Array1<f64>) -> Result<f64> {
    check_lengths(observed, predicted)?;
    check_lengths(observed, weights)?;
    check_positive("Observed severities", observed)?;
    check_positive("Predicted severities", predicted)?;
    check_non_negative("Case weights", weights)?;

    let total: f64 = observed
        .iter()
        .zip(predicted.iter())
        .zip(weights.iter())
        .map(|((&y, &mu), &w)| -2.0 * w * ((y / mu).ln() - (y - mu) / mu))
        .sum();
    Ok(total / observed.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_count_against_unit_rate() {
        let d = poisson_deviance(&array![0.0], &array![1.0]).unwrap();
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_poisson_matches_log_pmf_form() {
        // y = 2, mu = 0.5: -2 (log p(2|0.5) - log p(2|2))
        let log_pmf = |y: f64, mu: f64| y * mu.ln() - mu - 2f64.ln();
        let expected = -2.0 * (log_pmf(2.0, 0.5) - log_pmf(2.0, 2.0));
        let d = poisson_deviance(&array![2.0], &array![0.5]).unwrap();
        assert!((d - expected).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_predictions_have_zero_deviance() {
        let y = array![1.0, 3.0, 2.0];
        assert!(poisson_deviance(&y, &y).unwrap().abs() < 1e-12);
        assert!(gamma_deviance(&y, &y, &array![1.0, 1.0, 1.0]).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_exposure_scales_rates() {
        let counts = array![0.0, 1.0];
        let with_expo = poisson_deviance_with_exposure(&counts, &array![0.2, 0.2], &array![0.5, 1.0]).unwrap();
        let direct = poisson_deviance(&counts, &array![0.1, 0.2]).unwrap();
        assert!((with_expo - direct).abs() < 1e-12);
    }

    #[test]
    fn test_gamma_weights() {
        let d = gamma_deviance(&array![2.0], &array![1.0], &array![3.0]).unwrap();
        let expected = -2.0 * 3.0 * (2f64.ln() - 1.0);
        assert!((d - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(poisson_deviance(&array![1.0], &array![0.0]).is_err());
        assert!(poisson_deviance(&array![-1.0], &array![1.0]).is_err());
        assert!(poisson_deviance(&array![1.0, 2.0], &array![1.0]).is_err());
        assert!(gamma_deviance(&array![0.0], &array![1.0], &array![1.0]).is_err());
        assert!(poisson_deviance(&Array1::zeros(0), &Array1::zeros(0)).is_err());
    }
}
