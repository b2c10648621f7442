//! Small numeric helpers shared by the interpretation and lift layers

/// Arithmetic mean; NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Weighted mean `sum(w * x) / sum(w)`, skipping NaN values and their weights
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let (num, den) = values
        .iter()
        .zip(weights.iter())
        .filter(|(v, _)| !v.is_nan())
        .fold((0.0, 0.0), |(num, den), (&v, &w)| (num + w * v, den + w));
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

/// Type-7 (linear interpolation) quantile of an ascending slice
///
/// `p` is clamped to `[0, 1]`. Panics on an empty slice.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Round to a fixed number of decimal digits
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Compact label for a bin bound: integers without decimals, else 2 decimals
pub fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_sorted() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&v, 0.0), 1.0);
        assert_eq!(quantile_sorted(&v, 1.0), 4.0);
        assert!((quantile_sorted(&v, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile_sorted(&v, 0.25) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_mean() {
        assert!((weighted_mean(&[1.0, 3.0], &[1.0, 3.0]) - 2.5).abs() < 1e-12);
        assert!((weighted_mean(&[1.0, f64::NAN], &[1.0, 5.0]) - 1.0).abs() < 1e-12);
        assert!(weighted_mean(&[], &[]).is_nan());
    }

    #[test]
    fn test_round_and_format() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(format_bound(18.0), "18");
        assert_eq!(format_bound(0.815), "0.81");
        assert_eq!(format_bound(1.256), "1.26");
    }
}
