// ABOUTME: Descriptive statistics over trailing windows used by the outlier rules
// ABOUTME: Median, sample standard deviation and linearly interpolated quantiles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

/// Summary of a trailing window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    /// Sample count
    pub count: usize,
    /// Median
    pub median: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// First quartile
    pub q1: f64,
    /// Third quartile
    pub q3: f64,
}

impl WindowSummary {
    /// Summarize `values`; `None` for fewer than two finite samples
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.len() < 2 {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            count: sorted.len(),
            median: quantile_sorted(&sorted, 0.5)?,
            std_dev: sample_std_dev(&sorted)?,
            q1: quantile_sorted(&sorted, 0.25)?,
            q3: quantile_sorted(&sorted, 0.75)?,
        })
    }

    /// Interquartile range
    #[must_use]
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Arithmetic mean
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation with Bessel's correction
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Quantile of an ascending slice using linear interpolation between closest ranks
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let low = *sorted.get(lower)?;
    let high = *sorted.get(upper)?;
    Some((high - low).mul_add(position - lower as f64, low))
}

/// Median of unsorted values
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|a| (a - expected).abs() < 1e-12)
    }

    #[test]
    fn test_median_even_and_odd() {
        assert!(approx(median(&[3.0, 1.0, 2.0]), 2.0));
        assert!(approx(median(&[4.0, 1.0, 3.0, 2.0]), 2.5));
        assert!(median(&[]).is_none());
    }

    #[test]
    fn test_quartiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx(quantile_sorted(&sorted, 0.25), 2.0));
        assert!(approx(quantile_sorted(&sorted, 0.75), 4.0));
        assert!(approx(quantile_sorted(&[1.0, 2.0, 3.0, 4.0], 0.25), 1.75));
        assert!(quantile_sorted(&sorted, 1.5).is_none());
    }

    #[test]
    fn test_sample_std_dev() {
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap_or_default();
        assert!((sd - 2.138_089_935_299_395).abs() < 1e-9);
        assert!(sample_std_dev(&[1.0]).is_none());
    }

    #[test]
    fn test_window_summary_ignores_non_finite() {
        let summary = WindowSummary::from_values(&[1.0, f64::NAN, 3.0]);
        assert!(summary.is_some_and(|s| s.count == 2 && (s.median - 2.0).abs() < 1e-12));
    }
}
