// ABOUTME: Fatal materialization failures with the detail an operator needs to remediate
// ABOUTME: Converts into AppError with a distinct ErrorCode per failure kind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use thiserror::Error;

use super::{AppError, ErrorCode};
use crate::models::BodyMetric;

/// Errors that abort a materialization run before anything is persisted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializationError {
    /// No parameter version is effective on this date
    #[error("no parameter version covers {date}; add or extend a version to cover it")]
    NoParameterVersion {
        /// First uncovered date
        date: NaiveDate,
    },

    /// A from-scratch rebuild has no valid value to seed this metric
    #[error("cannot seed {metric} at {date}: no admitted observation at or before it; supply an explicit seed")]
    UnseedableMetric {
        /// Metric that could not be seeded
        metric: BodyMetric,
        /// First date of the rebuild window
        date: NaiveDate,
    },

    /// Another run owns an overlapping date range
    #[error("range {start}..={end} overlaps a run already in progress")]
    RangeLocked {
        /// Requested start
        start: NaiveDate,
        /// Requested end
        end: NaiveDate,
    },

    /// Requested range is malformed
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Run state machine rejected a transition
    #[error("illegal run transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },
}

impl MaterializationError {
    /// Error code matching this failure
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoParameterVersion { .. } => ErrorCode::ParameterCoverageMissing,
            Self::UnseedableMetric { .. } => ErrorCode::SeedUnavailable,
            Self::RangeLocked { .. } => ErrorCode::RangeLocked,
            Self::InvalidRange(_) => ErrorCode::InvalidInput,
            Self::InvalidTransition { .. } => ErrorCode::InvalidRunTransition,
        }
    }
}

impl From<MaterializationError> for AppError {
    fn from(error: MaterializationError) -> Self {
        Self::new(error.code(), error.to_string()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseedable_metric_names_metric_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let error = MaterializationError::UnseedableMetric {
            metric: BodyMetric::FatMass,
            date,
        };
        let message = error.to_string();
        assert!(message.contains("fat_mass"));
        assert!(message.contains("2024-01-01"));

        let app: AppError = error.into();
        assert_eq!(app.code, ErrorCode::SeedUnavailable);
    }

    #[test]
    fn test_no_parameter_version_maps_to_coverage_code() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default();
        let app: AppError = MaterializationError::NoParameterVersion { date }.into();
        assert_eq!(app.code, ErrorCode::ParameterCoverageMissing);
        assert!(app.message.contains("2023-12-31"));
    }
}
