// src/math.rs
use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.mean())
}

/// Weighted mean of `(value, weight)` pairs.
/// Returns `None` when the total weight is not positive.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }
    let weighted_sum: f64 = pairs.iter().map(|(v, w)| v * w).sum();
    Some(weighted_sum / total_weight)
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.std_dev()
}

/// Coefficient of variation in percent; 0 when the mean is not positive
pub fn coefficient_of_variation(std_dev: f64, mean: f64) -> f64 {
    if mean > 0.0 {
        std_dev / mean * 100.0
    } else {
        0.0
    }
}

/// Number of values strictly outside `[mean * (1 - band), mean * (1 + band)]`
pub fn count_outside_band(values: &[f64], mean: f64, band: f64) -> usize {
    let lower = mean * (1.0 - band);
    let upper = mean * (1.0 + band);
    values.iter().filter(|&&v| v < lower || v > upper).count()
}

/// Percentage change from `base` to `value`: `(value / base - 1) * 100`
pub fn pct_change(base: f64, value: f64) -> Option<f64> {
    if base > 0.0 && base.is_finite() && value.is_finite() {
        Some((value / base - 1.0) * 100.0)
    } else {
        None
    }
}

/// Ratio `numerator / denominator`, `None` unless the denominator is positive
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 && denominator.is_finite() && numerator.is_finite() {
        Some(numerator / denominator)
    } else {
        None
    }
}
