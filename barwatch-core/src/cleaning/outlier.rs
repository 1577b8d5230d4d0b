//! Statistical outlier detection on a single numeric column.
//!
//! Two independent tests:
//! - IQR: flag points strictly outside `[Q1 - k*IQR, Q3 + k*IQR]`
//! - Z-score: flag points with `|x - mean| / stddev > t`
//!
//! Quartiles use linear interpolation between order statistics. The z-score
//! uses the population standard deviation of the non-null values. Nulls are
//! never flagged. All functions are pure: a column in, a mask out.

use crate::config::{OutlierConfig, OutlierMethod};

/// Linear-interpolated quantile of an ascending-sorted, non-empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// IQR bounds `(lower, upper)` for the non-null values, or `None` if there
/// are none.
pub fn iqr_bounds(values: &[Option<f64>], multiplier: f64) -> Option<(f64, f64)> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q1 = quantile(&present, 0.25);
    let q3 = quantile(&present, 0.75);
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

/// Flag points strictly outside the IQR fences.
pub fn detect_iqr(values: &[Option<f64>], multiplier: f64) -> Vec<bool> {
    let Some((lower, upper)) = iqr_bounds(values, multiplier) else {
        return vec![false; values.len()];
    };
    values
        .iter()
        .map(|v| v.is_some_and(|x| x < lower || x > upper))
        .collect()
}

/// Flag points whose absolute z-score exceeds `threshold`.
///
/// A constant column has zero spread and flags nothing.
pub fn detect_zscore(values: &[Option<f64>], threshold: f64) -> Vec<bool> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return vec![false; values.len()];
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std < 1e-15 {
        return vec![false; values.len()];
    }

    values
        .iter()
        .map(|v| v.is_some_and(|x| ((x - mean) / std).abs() > threshold))
        .collect()
}

/// Element-wise AND of two masks.
pub fn combine(a: &[bool], b: &[bool]) -> Vec<bool> {
    a.iter().zip(b).map(|(x, y)| *x && *y).collect()
}

/// Run the configured tests and return the mask of points to replace.
pub fn detect(values: &[Option<f64>], config: &OutlierConfig) -> Vec<bool> {
    let iqr = detect_iqr(values, config.iqr_multiplier);
    match config.method {
        OutlierMethod::IqrOnly => iqr,
        OutlierMethod::Combined => combine(&iqr, &detect_zscore(values, config.zscore_threshold)),
    }
}
