// ABOUTME: Pure computation engine for daily series materialization
// ABOUTME: Parameter timelines, outlier rules, gap fill, smoothers, derived metrics, weekly roll-ups
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

#![deny(unsafe_code)]

//! # healthseries Engine
//!
//! Deterministic, I/O-free computation. Callers load inputs once, run the
//! sequential [`SeriesEngine`] fold over a date range, and persist the result.
//!
//! ## Modules
//!
//! - **`parameter_timeline`**: date to effective parameter version
//! - **`outlier_detection`**: ordered plausibility rules
//! - **`gap_fill`**: forward-fill from the latest admitted reading
//! - **`smoother`**: EMA and Kalman estimators
//! - **`derived_metrics`**: BMR, compensated exercise, net energy
//! - **`series_engine`**: the per-range fold
//! - **`weekly_aggregation`**: Monday to Sunday snapshots

/// Engine configuration (outlier thresholds, smoother, lookback)
pub mod config;

/// Effective-dated parameter resolution
pub mod parameter_timeline;

/// Trailing-window descriptive statistics
pub mod statistics;

/// Ordered outlier predicates
pub mod outlier_detection;

/// Forward-fill value source
pub mod gap_fill;

/// EMA and Kalman smoothers
pub mod smoother;

/// Energy metrics derived from smoothed lean mass
pub mod derived_metrics;

/// Sequential series fold
pub mod series_engine;

/// Weekly snapshot aggregation
pub mod weekly_aggregation;

pub use config::{ConfigError, EngineConfig, FatMassEstimator, OutlierConfig, SmootherConfig};
pub use derived_metrics::DerivedMetrics;
pub use gap_fill::{FilledValue, GapFillSource};
pub use outlier_detection::{Observation, OutlierDetector, OutlierVerdict};
pub use parameter_timeline::ParameterTimeline;
pub use series_engine::{ComputedDay, Exclusion, ReadingKey, SeriesEngine, SeriesInput, SeriesOutput};
pub use smoother::{EmaSmoother, KalmanEstimator, KalmanState};
pub use weekly_aggregation::{WeekInput, WeeklyAggregator};
