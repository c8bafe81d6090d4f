// ABOUTME: Domain models for raw facts, parameter versions, audit records and materialized output
// ABOUTME: Plain serde types shared by the engine and the persistence layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Core data models

/// Raw daily facts and body-composition metrics
pub mod daily_fact;
/// Inclusive calendar date ranges
pub mod date_range;
/// Materialized output rows and smoother seed state
pub mod materialized_day;
/// Outlier rules, audit entries and reviewer admissions
pub mod outlier;
/// Effective-dated coefficient sets
pub mod parameter_version;
/// Materialization run records and state machine
pub mod run;
/// Immutable weekly roll-ups
pub mod weekly_snapshot;

pub use daily_fact::{BodyMetric, DailyFact};
pub use date_range::DateRange;
pub use materialized_day::{MaterializedDay, SeedState};
pub use outlier::{OutlierAdmission, OutlierAudit, OutlierRule};
pub use parameter_version::ParameterVersion;
pub use run::{MaterializationOutcome, MaterializationRun, RunMode, RunState};
pub use weekly_snapshot::WeeklySnapshot;
