// ABOUTME: Outlier detection thresholds per metric and for the trailing-window statistics
// ABOUTME: Z-score cutoff and IQR multiplier are tunable per deployment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use serde::{Deserialize, Serialize};

use healthseries_core::constants::{outlier_defaults, physiological_bounds};
use healthseries_core::models::BodyMetric;

/// Thresholds for a single body-composition metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    /// Lowest plausible value (kg)
    pub min_kg: f64,
    /// Highest plausible value (kg)
    pub max_kg: f64,
    /// Largest change per elapsed day from the prior valid reading (kg)
    pub max_daily_delta_kg: f64,
}

/// Outlier detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Fat-mass thresholds
    pub fat_mass: MetricBounds,
    /// Fat-free-mass thresholds
    pub fat_free_mass: MetricBounds,
    /// Z-score above which a reading is excluded
    pub z_score_cutoff: f64,
    /// Fence multiplier applied to the interquartile range
    pub iqr_multiplier: f64,
    /// Length of the trailing window for the statistical rules
    pub trailing_window_days: i64,
    /// Admitted samples required before the statistical rules apply
    pub min_samples: usize,
}

impl OutlierConfig {
    /// Thresholds for `metric`
    #[must_use]
    pub const fn bounds(&self, metric: BodyMetric) -> &MetricBounds {
        match metric {
            BodyMetric::FatMass => &self.fat_mass,
            BodyMetric::FatFreeMass => &self.fat_free_mass,
        }
    }
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            fat_mass: MetricBounds {
                min_kg: physiological_bounds::FAT_MASS_MIN_KG,
                max_kg: physiological_bounds::FAT_MASS_MAX_KG,
                max_daily_delta_kg: outlier_defaults::FAT_MASS_MAX_DAILY_DELTA_KG,
            },
            fat_free_mass: MetricBounds {
                min_kg: physiological_bounds::FAT_FREE_MASS_MIN_KG,
                max_kg: physiological_bounds::FAT_FREE_MASS_MAX_KG,
                max_daily_delta_kg: outlier_defaults::FAT_FREE_MASS_MAX_DAILY_DELTA_KG,
            },
            z_score_cutoff: outlier_defaults::Z_SCORE_CUTOFF,
            iqr_multiplier: outlier_defaults::IQR_MULTIPLIER,
            trailing_window_days: outlier_defaults::TRAILING_WINDOW_DAYS,
            min_samples: outlier_defaults::MIN_SAMPLES,
        }
    }
}
