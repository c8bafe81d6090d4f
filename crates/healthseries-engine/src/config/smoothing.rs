// ABOUTME: Smoother configuration selecting the fat-mass estimator and its noise model
// ABOUTME: Lean mass always uses the EMA; fat mass may use EMA or a scalar Kalman filter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use healthseries_core::constants::smoothing;

use super::ConfigError;

/// Estimator used for the fat-mass series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatMassEstimator {
    /// Exponential moving average with the version's `alpha_fat_mass`
    Ema,
    /// Random-walk Kalman filter
    Kalman,
}

impl fmt::Display for FatMassEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ema => f.write_str("ema"),
            Self::Kalman => f.write_str("kalman"),
        }
    }
}

impl FromStr for FatMassEstimator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ema" => Ok(Self::Ema),
            "kalman" => Ok(Self::Kalman),
            other => Err(ConfigError::Parse(format!(
                "unknown fat-mass estimator '{other}' (expected ema or kalman)"
            ))),
        }
    }
}

/// Smoother configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmootherConfig {
    /// Fat-mass estimator
    pub fat_mass_estimator: FatMassEstimator,
    /// Variance added per elapsed day (kg^2)
    pub process_noise: f64,
    /// Scale measurement variance (kg^2)
    pub measurement_noise: f64,
    /// Variance assumed at a cold seed; defaults to the measurement noise
    pub initial_variance: Option<f64>,
}

impl SmootherConfig {
    /// Variance used when no persisted variance is available
    #[must_use]
    pub fn cold_variance(&self) -> f64 {
        self.initial_variance.unwrap_or(self.measurement_noise)
    }
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            fat_mass_estimator: FatMassEstimator::Ema,
            process_noise: smoothing::KALMAN_PROCESS_NOISE,
            measurement_noise: smoothing::KALMAN_MEASUREMENT_NOISE,
            initial_variance: None,
        }
    }
}
