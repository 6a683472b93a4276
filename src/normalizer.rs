//! Min-max normalization and the scalar reductions the metrics share
//!
//! All functions here are pure: no allocation beyond the returned vector and no
//! failure mode other than returning `None` for empty input.

/// Rescale values to [0, 1] by `(v - min) / (max - min)`.
///
/// When every value is equal the range is zero and each element maps to 0.5.
/// Empty input yields an empty vector.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range == 0.0 {
        return vec![0.5; values.len()];
    }

    values.iter().map(|v| (v - min) / range).collect()
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}
