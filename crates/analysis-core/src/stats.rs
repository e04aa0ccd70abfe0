//! Small descriptive-statistics helpers shared by the indicator engine and
//! the volatility guard.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Compute population standard deviation (divides by n).
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Compute the z-score of `value` relative to `data`.
/// Returns 0.0 if data has insufficient variance.
pub fn z_score_of(value: f64, data: &[f64]) -> f64 {
    let sd = std_dev(data);
    if sd < f64::EPSILON {
        return 0.0;
    }
    (value - mean(data)) / sd
}

/// Simple close-to-close returns.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// The last `n` elements of a slice (or all of it when shorter).
pub fn tail(data: &[f64], n: usize) -> &[f64] {
    &data[data.len().saturating_sub(n)..]
}
