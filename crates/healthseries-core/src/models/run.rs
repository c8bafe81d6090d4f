// ABOUTME: Materialization run record, mode and lifecycle state machine
// ABOUTME: Transitions are validated so a run can only fail while computing or persisting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{AppError, MaterializationError};

/// How the run chose its range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// From the day after the latest materialized date to the latest fact date
    ExtendForward,
    /// Explicit range, fully rebuilt
    Rebuild,
}

impl RunMode {
    /// Stable storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtendForward => "extend_forward",
            Self::Rebuild => "rebuild",
        }
    }
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extend_forward" => Ok(Self::ExtendForward),
            "rebuild" => Ok(Self::Rebuild),
            other => Err(AppError::invalid_input(format!("unknown run mode '{other}'"))),
        }
    }
}

/// Run lifecycle
///
/// `Pending -> ResolvingRange -> Computing -> Persisting -> Completed`, with
/// `Failed` reachable from `Computing` and `Persisting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, nothing resolved yet
    Pending,
    /// Determining the effective date range
    ResolvingRange,
    /// Sequential in-memory pass
    Computing,
    /// Strip-and-replace transaction in flight
    Persisting,
    /// Rows committed
    Completed,
    /// Aborted; nothing from this run was committed
    Failed,
}

impl RunState {
    /// Stable storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ResolvingRange => "resolving_range",
            Self::Computing => "computing",
            Self::Persisting => "persisting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::ResolvingRange)
                | (Self::ResolvingRange, Self::Computing)
                | (Self::Computing, Self::Persisting | Self::Failed)
                | (Self::Persisting, Self::Completed | Self::Failed)
        )
    }

    /// Move to `next` or report the illegal transition
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when `next` is not a legal successor
    pub fn transition(self, next: Self) -> Result<Self, MaterializationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(MaterializationError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolving_range" => Ok(Self::ResolvingRange),
            "computing" => Ok(Self::Computing),
            "persisting" => Ok(Self::Persisting),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::invalid_input(format!("unknown run state '{other}'"))),
        }
    }
}

/// Persisted run log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializationRun {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Range selection mode
    pub mode: RunMode,
    /// Start date as requested, if any
    pub requested_start: Option<NaiveDate>,
    /// End date as requested, if any
    pub requested_end: Option<NaiveDate>,
    /// Start date actually computed
    pub start_date: Option<NaiveDate>,
    /// End date actually computed
    pub end_date: Option<NaiveDate>,
    /// Last recorded state
    pub state: RunState,
    /// Rows written
    pub rows_processed: i64,
    /// Readings newly excluded by this run
    pub outliers_flagged: i64,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// Error code for failed runs
    pub error_code: Option<String>,
    /// Error message for failed runs
    pub error_detail: Option<String>,
    /// Effective engine configuration
    pub engine_config: serde_json::Value,
}

/// Result returned to the caller of a materialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationOutcome {
    /// Run identifier
    pub run_id: Uuid,
    /// Rows written
    pub rows_processed: u64,
    /// Readings newly excluded
    pub outliers_flagged: u64,
    /// Range computed; `None` when extend-forward found nothing new
    pub start_date: Option<NaiveDate>,
    /// End of the computed range
    pub end_date: Option<NaiveDate>,
}
