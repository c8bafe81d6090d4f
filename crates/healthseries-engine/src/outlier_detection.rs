// ABOUTME: Ordered outlier predicates for body-composition readings, combined by OR
// ABOUTME: Each rule is a standalone function; the detector reports the first rule that fires
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Outlier detection
//!
//! Rules are evaluated in a fixed order against trailing history only:
//!
//! 1. physiological bound for the metric
//! 2. change from the nearest admitted prior reading, scaled by elapsed days
//! 3. z-score against the trailing-window median and standard deviation
//! 4. interquartile-range fence over the same window
//!
//! The statistical rules stay silent until the window holds `min_samples` readings,
//! and when the window has no spread.

use chrono::NaiveDate;

use healthseries_core::constants::smoothing::MIN_VARIANCE;
use healthseries_core::models::{BodyMetric, OutlierRule};

use crate::config::{MetricBounds, OutlierConfig};
use crate::statistics::WindowSummary;

/// An admitted reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Date of the reading
    pub date: NaiveDate,
    /// Value in kg
    pub value: f64,
}

impl Observation {
    /// Create an observation
    #[must_use]
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Rule that rejected a reading and the thresholds involved
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierVerdict {
    /// First rule that fired
    pub rule: OutlierRule,
    /// Explanation recorded in the audit
    pub reason: String,
}

/// Evaluation order
pub const RULE_ORDER: [OutlierRule; 4] = [
    OutlierRule::PhysiologicalBound,
    OutlierRule::AdjacentDelta,
    OutlierRule::ZScore,
    OutlierRule::IqrFence,
];

/// Inputs shared by every rule for one candidate
struct RuleContext<'h> {
    date: NaiveDate,
    value: f64,
    bounds: &'h MetricBounds,
    prior: Option<&'h Observation>,
    window: Option<WindowSummary>,
}

/// Classifies candidate readings against configured thresholds
#[derive(Debug, Clone, Copy)]
pub struct OutlierDetector<'a> {
    config: &'a OutlierConfig,
}

impl<'a> OutlierDetector<'a> {
    /// Create a detector over `config`
    #[must_use]
    pub const fn new(config: &'a OutlierConfig) -> Self {
        Self { config }
    }

    /// Classify `candidate` observed on `date`
    ///
    /// `history` holds admitted readings of the same metric strictly before `date`,
    /// in ascending date order. A missing candidate is never an outlier.
    #[must_use]
    pub fn detect(
        &self,
        metric: BodyMetric,
        date: NaiveDate,
        candidate: Option<f64>,
        history: &[Observation],
    ) -> Option<OutlierVerdict> {
        let value = candidate?;
        let prior_end = history.partition_point(|obs| obs.date < date);
        let prior = &history[..prior_end];

        let context = RuleContext {
            date,
            value,
            bounds: self.config.bounds(metric),
            prior: prior.last(),
            window: self.trailing_window(date, prior),
        };

        RULE_ORDER.iter().find_map(|rule| {
            self.evaluate(*rule, &context).map(|reason| OutlierVerdict {
                rule: *rule,
                reason,
            })
        })
    }

    /// Whether `candidate` would be excluded
    #[must_use]
    pub fn is_outlier(
        &self,
        metric: BodyMetric,
        date: NaiveDate,
        candidate: Option<f64>,
        history: &[Observation],
    ) -> bool {
        self.detect(metric, date, candidate, history).is_some()
    }

    fn evaluate(&self, rule: OutlierRule, context: &RuleContext<'_>) -> Option<String> {
        match rule {
            OutlierRule::PhysiologicalBound => {
                check_physiological_bound(context.value, context.bounds)
            }
            OutlierRule::AdjacentDelta => check_adjacent_delta(
                context.date,
                context.value,
                context.prior,
                context.bounds.max_daily_delta_kg,
            ),
            OutlierRule::ZScore => check_z_score(
                context.value,
                context.window.as_ref(),
                self.config.z_score_cutoff,
                self.config.min_samples,
            ),
            OutlierRule::IqrFence => check_iqr_fence(
                context.value,
                context.window.as_ref(),
                self.config.iqr_multiplier,
                self.config.min_samples,
            ),
        }
    }

    fn trailing_window(&self, date: NaiveDate, prior: &[Observation]) -> Option<WindowSummary> {
        let window_start = date - chrono::Duration::days(self.config.trailing_window_days);
        let first = prior.partition_point(|obs| obs.date < window_start);
        let values: Vec<f64> = prior[first..].iter().map(|obs| obs.value).collect();
        WindowSummary::from_values(&values)
    }
}

/// Value outside the metric's plausible range (non-finite values always fail)
#[must_use]
pub fn check_physiological_bound(value: f64, bounds: &MetricBounds) -> Option<String> {
    if (bounds.min_kg..=bounds.max_kg).contains(&value) {
        None
    } else {
        Some(format!(
            "value {value:.3} kg outside plausible range [{:.1}, {:.1}] kg",
            bounds.min_kg, bounds.max_kg
        ))
    }
}

/// Change from the nearest admitted prior reading exceeds `max_daily_delta` per elapsed day
#[must_use]
pub fn check_adjacent_delta(
    date: NaiveDate,
    value: f64,
    prior: Option<&Observation>,
    max_daily_delta: f64,
) -> Option<String> {
    let prior = prior?;
    let elapsed_days = (date - prior.date).num_days().max(1);
    let limit = max_daily_delta * elapsed_days as f64;
    let delta = (value - prior.value).abs();
    (delta > limit).then(|| {
        format!(
            "change of {delta:.3} kg since {} exceeds {limit:.3} kg over {elapsed_days} day(s)",
            prior.date
        )
    })
}

/// Distance from the window median in standard deviations exceeds `cutoff`
#[must_use]
pub fn check_z_score(
    value: f64,
    window: Option<&WindowSummary>,
    cutoff: f64,
    min_samples: usize,
) -> Option<String> {
    let window = window.filter(|w| w.count >= min_samples)?;
    if window.std_dev < MIN_VARIANCE {
        return None;
    }
    let z = (value - window.median).abs() / window.std_dev;
    (z > cutoff).then(|| {
        format!(
            "z-score {z:.2} exceeds cutoff {cutoff} (median {:.3}, sd {:.3}, n={})",
            window.median, window.std_dev, window.count
        )
    })
}

/// Value outside `[q1 - k*iqr, q3 + k*iqr]` of the window
#[must_use]
pub fn check_iqr_fence(
    value: f64,
    window: Option<&WindowSummary>,
    multiplier: f64,
    min_samples: usize,
) -> Option<String> {
    let window = window.filter(|w| w.count >= min_samples)?;
    let iqr = window.iqr();
    if iqr < MIN_VARIANCE {
        return None;
    }
    let lower = multiplier.mul_add(-iqr, window.q1);
    let upper = multiplier.mul_add(iqr, window.q3);
    (value < lower || value > upper).then(|| {
        format!("value {value:.3} kg outside IQR fence [{lower:.3}, {upper:.3}] (k={multiplier})")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default() + chrono::Duration::days(i64::from(day))
    }

    fn steady_history(days: u32) -> Vec<Observation> {
        (0..days)
            .map(|d| {
                let wobble = if d % 2 == 0 { 0.15 } else { -0.15 };
                Observation::new(date(d), 20.0 + wobble)
            })
            .collect()
    }

    #[test]
    fn test_missing_value_is_never_an_outlier() {
        let config = OutlierConfig::default();
        let detector = OutlierDetector::new(&config);
        assert!(detector
            .detect(BodyMetric::FatMass, date(1), None, &[])
            .is_none());
    }

    #[test]
    fn test_bound_rule_fires_first() {
        let config = OutlierConfig::default();
        let detector = OutlierDetector::new(&config);
        let history = steady_history(20);
        let verdict = detector.detect(BodyMetric::FatMass, date(20), Some(200.0), &history);
        assert_eq!(
            verdict.map(|v| v.rule),
            Some(OutlierRule::PhysiologicalBound)
        );
        assert!(detector.is_outlier(BodyMetric::FatMass, date(20), Some(200.0), &history));
        assert!(!detector.is_outlier(BodyMetric::FatMass, date(20), Some(20.1), &history));
    }

    #[test]
    fn test_adjacent_delta_scales_with_elapsed_days() {
        let prior = Observation::new(date(0), 20.0);
        assert!(check_adjacent_delta(date(1), 23.0, Some(&prior), 2.0).is_some());
        assert!(check_adjacent_delta(date(2), 23.0, Some(&prior), 2.0).is_none());
        assert!(check_adjacent_delta(date(1), 23.0, None, 2.0).is_none());
    }

    #[test]
    fn test_z_score_requires_min_samples_and_spread() {
        let flat: Vec<f64> = vec![20.0; 10];
        let summary = WindowSummary::from_values(&flat);
        assert!(check_z_score(25.0, summary.as_ref(), 3.5, 7).is_none());

        let few = WindowSummary::from_values(&[19.9, 20.1, 20.0]);
        assert!(check_z_score(25.0, few.as_ref(), 3.5, 7).is_none());
    }

    #[test]
    fn test_statistical_rules_catch_moderate_shift() {
        let config = OutlierConfig::default();
        let detector = OutlierDetector::new(&config);
        let history = steady_history(30);
        // within bounds and the daily delta, but far outside the window spread
        let verdict = detector.detect(BodyMetric::FatMass, date(30), Some(21.5), &history);
        assert_eq!(verdict.map(|v| v.rule), Some(OutlierRule::ZScore));
    }

    #[test]
    fn test_iqr_fence_bounds() {
        let values: Vec<f64> = (0..12).map(|i| 20.0 + f64::from(i) * 0.1).collect();
        let summary = WindowSummary::from_values(&values);
        assert!(check_iqr_fence(20.5, summary.as_ref(), 3.0, 7).is_none());
        assert!(check_iqr_fence(25.0, summary.as_ref(), 3.0, 7).is_some());
    }

    #[test]
    fn test_only_trailing_window_counts() {
        let mut config = OutlierConfig::default();
        config.trailing_window_days = 5;
        let detector = OutlierDetector::new(&config);
        let history = steady_history(30);
        let window = detector.trailing_window(date(30), &history);
        assert_eq!(window.map(|w| w.count), Some(5));
    }
}
