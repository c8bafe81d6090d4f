// ABOUTME: Top-level application configuration assembled from environment variables
// ABOUTME: Combines database settings with the validated engine configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use serde::{Deserialize, Serialize};
use tracing::info;

use healthseries_engine::config::EngineConfig;

use super::database::DatabaseConfig;
use crate::errors::AppResult;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Engine thresholds and smoother selection
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Load configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if any variable fails to parse or the engine configuration is invalid
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            database: DatabaseConfig::from_env()?,
            engine: EngineConfig::from_env()?,
        };
        config.log_summary();
        Ok(config)
    }

    fn log_summary(&self) {
        info!(
            database = %self.database.url,
            estimator = %self.engine.smoothing.fat_mass_estimator,
            z_score_cutoff = self.engine.outliers.z_score_cutoff,
            iqr_multiplier = self.engine.outliers.iqr_multiplier,
            lookback_days = self.engine.lookback_days,
            "Configuration loaded"
        );
    }
}
