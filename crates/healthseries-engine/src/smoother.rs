// ABOUTME: Sequential state smoothers for body-composition trends
// ABOUTME: Per-day EMA for fat and lean mass, scalar random-walk Kalman filter for fat mass
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! State smoothing
//!
//! Both smoothers advance one calendar day at a time. The EMA applies
//! `new = prior * (1 - alpha) + value * alpha` once per elapsed day with the same
//! (gap-filled) value. The Kalman filter adds process noise per elapsed day and
//! only updates on days with an admitted observation.

use serde::{Deserialize, Serialize};

use crate::config::SmootherConfig;

/// Exponential moving average applied per elapsed day
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaSmoother;

impl EmaSmoother {
    /// Advance `prior` by `days_since_prior` days toward `value`
    ///
    /// Zero elapsed days leaves the state unchanged.
    #[must_use]
    pub fn advance(prior: f64, value: f64, days_since_prior: u32, alpha: f64) -> f64 {
        (0..days_since_prior).fold(prior, |state, _| value.mul_add(alpha, state * (1.0 - alpha)))
    }

    /// Largest possible move in one step from `prior` toward `value`
    #[must_use]
    pub fn single_step_bound(prior: f64, value: f64, alpha: f64) -> f64 {
        (value - prior).abs() * alpha
    }
}

/// Kalman estimate and its variance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    /// Estimated fat mass (kg)
    pub estimate: f64,
    /// Estimate variance (kg^2)
    pub variance: f64,
}

/// Random-walk Kalman filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanEstimator {
    process_noise: f64,
    measurement_noise: f64,
    cold_variance: f64,
}

impl KalmanEstimator {
    /// Create an estimator with explicit noise terms; cold variance equals `measurement_noise`
    #[must_use]
    pub const fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            cold_variance: measurement_noise,
        }
    }

    /// Create an estimator from smoother configuration
    #[must_use]
    pub fn from_config(config: &SmootherConfig) -> Self {
        Self {
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            cold_variance: config.cold_variance(),
        }
    }

    /// State for a cold start at `estimate`
    #[must_use]
    pub const fn seed(&self, estimate: f64) -> KalmanState {
        KalmanState {
            estimate,
            variance: self.cold_variance,
        }
    }

    /// Predict step: estimate unchanged, variance grows by process noise per day
    #[must_use]
    pub fn predict(&self, state: KalmanState, days: u32) -> KalmanState {
        KalmanState {
            estimate: state.estimate,
            variance: self
                .process_noise
                .mul_add(f64::from(days), state.variance),
        }
    }

    /// Update step with an admitted observation
    #[must_use]
    pub fn update(&self, state: KalmanState, observation: f64) -> KalmanState {
        let gain = state.variance / (state.variance + self.measurement_noise);
        KalmanState {
            estimate: gain.mul_add(observation - state.estimate, state.estimate),
            variance: (1.0 - gain) * state.variance,
        }
    }

    /// Predict over `days`, then update when an admitted observation exists
    #[must_use]
    pub fn advance(&self, state: KalmanState, days: u32, observation: Option<f64>) -> KalmanState {
        let predicted = self.predict(state, days);
        match observation {
            Some(z) => self.update(predicted, z),
            None => predicted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_scenario_with_missing_day() {
        // seed 20.0, alpha 0.25, observations 20.4, missing (filled 20.4), 19.8
        let day1 = EmaSmoother::advance(20.0, 20.4, 1, 0.25);
        let day2 = EmaSmoother::advance(day1, 20.4, 1, 0.25);
        let day3 = EmaSmoother::advance(day2, 19.8, 1, 0.25);
        assert!((day1 - 20.1).abs() < 1e-9);
        assert!((day2 - 20.175).abs() < 1e-9);
        assert!((day3 - 20.081_25).abs() < 1e-9);
    }

    #[test]
    fn test_ema_multi_day_equals_repeated_single_days() {
        let once = EmaSmoother::advance(20.0, 21.0, 3, 0.3);
        let mut stepped = 20.0;
        for _ in 0..3 {
            stepped = EmaSmoother::advance(stepped, 21.0, 1, 0.3);
        }
        assert!((once - stepped).abs() < 1e-12);
        assert!((EmaSmoother::advance(20.0, 21.0, 0, 0.3) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kalman_variance_grows_without_observation() {
        let kalman = KalmanEstimator::new(0.0196, 2.89);
        let state = kalman.seed(20.0);
        let observed = kalman.advance(state, 1, Some(20.2));
        let skipped = kalman.advance(state, 1, None);
        assert!(skipped.variance > observed.variance);
        assert!((skipped.variance - (2.89 + 0.0196)).abs() < 1e-12);
        assert!((skipped.estimate - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kalman_update_moves_toward_observation() {
        let kalman = KalmanEstimator::new(0.0196, 2.89);
        let state = kalman.seed(20.0);
        let next = kalman.advance(state, 1, Some(21.0));
        assert!(next.estimate > 20.0 && next.estimate < 21.0);
        let gain = (2.89 + 0.0196) / (2.89 + 0.0196 + 2.89);
        assert!((next.estimate - (20.0 + gain)).abs() < 1e-12);
    }
}
