// ABOUTME: Outlier rule identifiers, append-only exclusion audit entries and reviewer admissions
// ABOUTME: An admission forces a (date, metric) value through detection on later rebuilds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::BodyMetric;
use crate::errors::AppError;

/// Rule that flagged a reading, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierRule {
    /// Outside the absolute plausible range for the metric
    PhysiologicalBound,
    /// Change from the nearest valid prior reading exceeds the scaled daily limit
    AdjacentDelta,
    /// Too many deviations from the trailing-window median
    ZScore,
    /// Outside the interquartile-range fence of the trailing window
    IqrFence,
}

impl OutlierRule {
    /// Stable storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhysiologicalBound => "physiological_bound",
            Self::AdjacentDelta => "adjacent_delta",
            Self::ZScore => "z_score",
            Self::IqrFence => "iqr_fence",
        }
    }
}

impl fmt::Display for OutlierRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierRule {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physiological_bound" => Ok(Self::PhysiologicalBound),
            "adjacent_delta" => Ok(Self::AdjacentDelta),
            "z_score" => Ok(Self::ZScore),
            "iqr_fence" => Ok(Self::IqrFence),
            other => Err(AppError::invalid_input(format!(
                "unknown outlier rule '{other}'"
            ))),
        }
    }
}

/// Record of one excluded reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierAudit {
    /// Date of the reading
    pub date: NaiveDate,
    /// Metric of the reading
    pub metric: BodyMetric,
    /// Value as ingested
    pub original_value: f64,
    /// Rule that fired first
    pub rule: OutlierRule,
    /// Human-readable explanation with the thresholds involved
    pub reason: String,
    /// Run that excluded it
    pub run_id: Uuid,
    /// When the exclusion was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Reviewer decision that a previously excluded reading is valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierAdmission {
    /// Date of the reading
    pub date: NaiveDate,
    /// Metric of the reading
    pub metric: BodyMetric,
    /// Who reversed the exclusion
    pub reviewer: String,
    /// Optional justification
    pub note: Option<String>,
    /// When the reversal happened
    pub admitted_at: DateTime<Utc>,
}
