// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Physiological bounds, estimator defaults and storage limits for the series engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Constants module
//!
//! Defaults here seed the engine configuration; every tunable threshold can be
//! overridden through the environment at runtime.

/// Service identity used in structured logs
pub mod service_names {
    /// Service name reported at startup
    pub const HEALTHSERIES: &str = "healthseries";
    /// Library log target
    pub const LOG_TARGET: &str = "healthseries";
}

/// Absolute plausible ranges per body-composition metric (kg)
pub mod physiological_bounds {
    /// Lowest plausible fat mass
    pub const FAT_MASS_MIN_KG: f64 = 1.0;
    /// Highest plausible fat mass
    pub const FAT_MASS_MAX_KG: f64 = 150.0;
    /// Lowest plausible fat-free mass
    pub const FAT_FREE_MASS_MIN_KG: f64 = 20.0;
    /// Highest plausible fat-free mass
    pub const FAT_FREE_MASS_MAX_KG: f64 = 150.0;
    /// Lowest plausible body weight
    pub const BODY_WEIGHT_MIN_KG: f64 = 30.0;
    /// Highest plausible body weight
    pub const BODY_WEIGHT_MAX_KG: f64 = 300.0;
}

/// Outlier rule defaults
pub mod outlier_defaults {
    /// Maximum fat-mass change per elapsed day before a reading is flagged
    pub const FAT_MASS_MAX_DAILY_DELTA_KG: f64 = 2.0;
    /// Maximum fat-free-mass change per elapsed day before a reading is flagged
    pub const FAT_FREE_MASS_MAX_DAILY_DELTA_KG: f64 = 2.5;
    /// Z-score cutoff against the trailing-window median and standard deviation
    pub const Z_SCORE_CUTOFF: f64 = 3.5;
    /// Tukey fence multiplier for the interquartile-range rule
    pub const IQR_MULTIPLIER: f64 = 3.0;
    /// Trailing window used by the statistical rules
    pub const TRAILING_WINDOW_DAYS: i64 = 90;
    /// Minimum admitted samples in the window before statistical rules apply
    pub const MIN_SAMPLES: usize = 7;
}

/// Smoother defaults
pub mod smoothing {
    /// Kalman process noise per elapsed day (kg^2)
    pub const KALMAN_PROCESS_NOISE: f64 = 0.0196;
    /// Kalman measurement noise (kg^2)
    pub const KALMAN_MEASUREMENT_NOISE: f64 = 2.89;
    /// Variances below this are treated as degenerate
    pub const MIN_VARIANCE: f64 = 1e-12;
}

/// Orchestrator defaults
pub mod materialization {
    /// Days of history loaded before the range start for outlier windows and gap fill
    pub const LOOKBACK_DAYS: i64 = 120;
    /// Retries for transient `database is locked` failures during persistence
    pub const PERSIST_MAX_RETRIES: u32 = 3;
    /// Default page size for the run log
    pub const DEFAULT_RUN_LIST_LIMIT: u32 = 20;
}

/// Weekly snapshot thresholds
pub mod weekly {
    /// Days in a snapshot week
    pub const DAYS_PER_WEEK: i64 = 7;
    /// Observed fat change below this magnitude yields no implied energy density
    pub const MIN_FAT_CHANGE_FOR_IMPLIED_DENSITY_KG: f64 = 0.05;
}
