// ABOUTME: Resolves a materialization request into a run mode and an effective date range
// ABOUTME: Extend-forward continues after the latest materialized date; explicit ranges rebuild
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::OutlierConfig;
use crate::errors::{AppError, AppResult, MaterializationError};
use crate::models::{BodyMetric, DateRange, RunMode, SeedState};

/// Rebuild trigger `(start, end, rebuild)` plus an optional explicit seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializeRequest {
    /// First date to compute
    pub start: Option<NaiveDate>,
    /// Last date to compute
    pub end: Option<NaiveDate>,
    /// Rebuild even without an explicit range
    pub rebuild: bool,
    /// State of the day before the first computed date
    pub seed: Option<SeedState>,
}

impl MaterializeRequest {
    /// Continue from the latest materialized date
    #[must_use]
    pub const fn extend_forward() -> Self {
        Self {
            start: None,
            end: None,
            rebuild: false,
            seed: None,
        }
    }

    /// Rebuild `[start, end]`
    #[must_use]
    pub const fn rebuild(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            rebuild: true,
            seed: None,
        }
    }

    /// Attach an explicit seed
    #[must_use]
    pub fn with_seed(mut self, seed: SeedState) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run mode implied by the request
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        if self.rebuild || self.start.is_some() || self.end.is_some() {
            RunMode::Rebuild
        } else {
            RunMode::ExtendForward
        }
    }
}

/// Store boundaries read before planning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreBounds {
    /// Latest materialized date
    pub latest_materialized: Option<NaiveDate>,
    /// Latest raw fact date
    pub latest_fact: Option<NaiveDate>,
    /// Earliest date with both fat mass and fat-free mass
    pub earliest_complete: Option<NaiveDate>,
}

/// Outcome of range resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePlan {
    /// Nothing new to compute
    UpToDate,
    /// Compute and replace this range
    Compute(DateRange),
}

/// Resolve the effective range for a request
///
/// A rebuild with an open bound starts at the earliest complete body-composition
/// date and ends at the latest fact date. Extend-forward with nothing new is a no-op.
///
/// # Errors
///
/// `InvalidRange` when an explicit range is reversed or a rebuild bound cannot be resolved
pub fn plan_range(
    request: &MaterializeRequest,
    bounds: &StoreBounds,
) -> Result<RangePlan, MaterializationError> {
    match request.mode() {
        RunMode::Rebuild => {
            let start = request
                .start
                .or(bounds.earliest_complete)
                .ok_or_else(|| {
                    MaterializationError::InvalidRange(
                        "no start given and no day carries both fat and fat-free mass".into(),
                    )
                })?;
            let end = request.end.or(bounds.latest_fact).ok_or_else(|| {
                MaterializationError::InvalidRange("no end given and no daily facts stored".into())
            })?;
            DateRange::new(start, end).map(RangePlan::Compute)
        }
        RunMode::ExtendForward => {
            let start = match bounds.latest_materialized {
                Some(latest) => latest.succ_opt(),
                None => bounds.earliest_complete,
            };
            match (start, bounds.latest_fact) {
                (Some(start), Some(end)) if start <= end => {
                    DateRange::new(start, end).map(RangePlan::Compute)
                }
                _ => Ok(RangePlan::UpToDate),
            }
        }
    }
}

/// Check an explicit seed against the plausible range of each metric
///
/// # Errors
///
/// `InvalidInput` naming the first non-finite or implausible field
pub fn validate_seed(seed: &SeedState, outliers: &OutlierConfig) -> AppResult<()> {
    for (field, value, metric) in [
        ("seed_fat_mass_kg", seed.fat_mass_kg, BodyMetric::FatMass),
        ("seed_lean_mass_kg", seed.lean_mass_kg, BodyMetric::FatFreeMass),
    ] {
        let bounds = outliers.bounds(metric);
        if !value.is_finite() || !(bounds.min_kg..=bounds.max_kg).contains(&value) {
            return Err(AppError::invalid_input(format!(
                "{field} {value} outside plausible range [{:.1}, {:.1}] kg",
                bounds.min_kg, bounds.max_kg
            )));
        }
    }
    if let Some(variance) = seed.fat_mass_variance {
        if !variance.is_finite() || variance <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "seed_fat_mass_variance {variance} must be positive and finite"
            )));
        }
    }
    Ok(())
}
