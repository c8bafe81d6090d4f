// ABOUTME: Engine configuration combining outlier thresholds, smoother settings and lookback
// ABOUTME: Loads defaults, applies SERIES_* environment overrides, then validates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Engine Configuration Module
//!
//! All values can be overridden via environment variables with the `SERIES_` prefix.
//! The effective configuration is threaded explicitly into every run and stored
//! with the run record, so there is no process-global instance.

pub mod error;
pub mod outliers;
pub mod smoothing;

pub use error::ConfigError;
pub use outliers::{MetricBounds, OutlierConfig};
pub use smoothing::{FatMassEstimator, SmootherConfig};

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use healthseries_core::constants::materialization;

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Outlier detector thresholds
    pub outliers: OutlierConfig,
    /// Smoother selection and noise model
    pub smoothing: SmootherConfig,
    /// Days of history loaded before a range start
    pub lookback_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            outliers: OutlierConfig::default(),
            smoothing: SmootherConfig::default(),
            lookback_days: materialization::LOOKBACK_DAYS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values or validation fails
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config = config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        for bounds in [&self.outliers.fat_mass, &self.outliers.fat_free_mass] {
            if bounds.min_kg >= bounds.max_kg {
                return Err(ConfigError::InvalidRange(
                    "physiological min_kg must be < max_kg",
                ));
            }
            if bounds.min_kg < 0.0 {
                return Err(ConfigError::ValueOutOfRange(
                    "physiological min_kg must be >= 0",
                ));
            }
            if bounds.max_daily_delta_kg <= 0.0 {
                return Err(ConfigError::ValueOutOfRange(
                    "max_daily_delta_kg must be > 0",
                ));
            }
        }

        if self.outliers.z_score_cutoff <= 0.0 {
            return Err(ConfigError::ValueOutOfRange("z_score_cutoff must be > 0"));
        }
        if self.outliers.iqr_multiplier <= 0.0 {
            return Err(ConfigError::ValueOutOfRange("iqr_multiplier must be > 0"));
        }
        if self.outliers.trailing_window_days <= 0 {
            return Err(ConfigError::ValueOutOfRange(
                "trailing_window_days must be > 0",
            ));
        }
        if self.outliers.min_samples < 4 {
            return Err(ConfigError::ValueOutOfRange("min_samples must be >= 4"));
        }

        if self.smoothing.process_noise <= 0.0 {
            return Err(ConfigError::ValueOutOfRange("process_noise must be > 0"));
        }
        if self.smoothing.measurement_noise <= 0.0 {
            return Err(ConfigError::ValueOutOfRange(
                "measurement_noise must be > 0",
            ));
        }
        if self.smoothing.initial_variance.is_some_and(|v| v <= 0.0) {
            return Err(ConfigError::ValueOutOfRange("initial_variance must be > 0"));
        }

        if self.lookback_days < self.outliers.trailing_window_days {
            return Err(ConfigError::InvalidRange(
                "lookback_days must be >= trailing_window_days",
            ));
        }

        Ok(())
    }

    /// Serialized form stored with each run
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Helper function to parse and apply an environment variable override
    fn apply_env_var<T: FromStr>(env_var_name: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Ok(val) = env::var(env_var_name) {
            *target = val
                .parse()
                .map_err(|_| ConfigError::Parse(format!("Invalid {env_var_name}")))?;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Physiological bounds
        Self::apply_env_var(
            "SERIES_FAT_MASS_MIN_KG",
            &mut self.outliers.fat_mass.min_kg,
        )?;
        Self::apply_env_var(
            "SERIES_FAT_MASS_MAX_KG",
            &mut self.outliers.fat_mass.max_kg,
        )?;
        Self::apply_env_var(
            "SERIES_FAT_FREE_MASS_MIN_KG",
            &mut self.outliers.fat_free_mass.min_kg,
        )?;
        Self::apply_env_var(
            "SERIES_FAT_FREE_MASS_MAX_KG",
            &mut self.outliers.fat_free_mass.max_kg,
        )?;

        // Adjacent-day deltas
        Self::apply_env_var(
            "SERIES_FAT_MASS_MAX_DAILY_DELTA_KG",
            &mut self.outliers.fat_mass.max_daily_delta_kg,
        )?;
        Self::apply_env_var(
            "SERIES_FAT_FREE_MASS_MAX_DAILY_DELTA_KG",
            &mut self.outliers.fat_free_mass.max_daily_delta_kg,
        )?;

        // Trailing-window statistics
        Self::apply_env_var(
            "SERIES_OUTLIER_Z_CUTOFF",
            &mut self.outliers.z_score_cutoff,
        )?;
        Self::apply_env_var(
            "SERIES_OUTLIER_IQR_MULTIPLIER",
            &mut self.outliers.iqr_multiplier,
        )?;
        Self::apply_env_var(
            "SERIES_OUTLIER_WINDOW_DAYS",
            &mut self.outliers.trailing_window_days,
        )?;
        Self::apply_env_var(
            "SERIES_OUTLIER_MIN_SAMPLES",
            &mut self.outliers.min_samples,
        )?;

        // Smoother
        Self::apply_env_var(
            "SERIES_FAT_MASS_ESTIMATOR",
            &mut self.smoothing.fat_mass_estimator,
        )?;
        Self::apply_env_var(
            "SERIES_KALMAN_PROCESS_NOISE",
            &mut self.smoothing.process_noise,
        )?;
        Self::apply_env_var(
            "SERIES_KALMAN_MEASUREMENT_NOISE",
            &mut self.smoothing.measurement_noise,
        )?;
        if let Ok(val) = env::var("SERIES_KALMAN_INITIAL_VARIANCE") {
            let variance = val.parse::<f64>().map_err(|_| {
                ConfigError::Parse("Invalid SERIES_KALMAN_INITIAL_VARIANCE".to_owned())
            })?;
            self.smoothing.initial_variance = Some(variance);
        }

        Self::apply_env_var("SERIES_LOOKBACK_DAYS", &mut self.lookback_days)?;

        Ok(self)
    }
}
