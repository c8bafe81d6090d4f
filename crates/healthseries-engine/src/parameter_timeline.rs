// ABOUTME: In-memory effective-dated parameter timeline resolving a date to its version
// ABOUTME: Built once per run; resolution is a pure lookup with explicit coverage failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;

use healthseries_core::errors::MaterializationError;
use healthseries_core::models::{DateRange, ParameterVersion};

/// Immutable set of parameter versions ordered by effective start date
#[derive(Debug, Clone, Default)]
pub struct ParameterTimeline {
    versions: Vec<ParameterVersion>,
}

impl ParameterTimeline {
    /// Build a timeline from versions in any order
    #[must_use]
    pub fn new(mut versions: Vec<ParameterVersion>) -> Self {
        versions.sort_by(|a, b| {
            a.effective_start_date
                .cmp(&b.effective_start_date)
                .then_with(|| a.version_id.cmp(&b.version_id))
        });
        Self { versions }
    }

    /// Effective version for `date`: the latest start on or before `date` whose
    /// window still contains it
    ///
    /// # Errors
    ///
    /// Returns `NoParameterVersion` when no version covers `date`
    pub fn resolve(&self, date: NaiveDate) -> Result<&ParameterVersion, MaterializationError> {
        let started = self
            .versions
            .partition_point(|v| v.effective_start_date <= date);
        self.versions[..started]
            .iter()
            .rev()
            .find(|v| v.covers(date))
            .ok_or(MaterializationError::NoParameterVersion { date })
    }

    /// Verify every date in `range` resolves
    ///
    /// # Errors
    ///
    /// Returns `NoParameterVersion` naming the first uncovered date
    pub fn check_coverage(&self, range: &DateRange) -> Result<(), MaterializationError> {
        for date in range.days() {
            self.resolve(date)?;
        }
        Ok(())
    }

    /// Look up a version by id
    #[must_use]
    pub fn get(&self, version_id: &str) -> Option<&ParameterVersion> {
        self.versions.iter().find(|v| v.version_id == version_id)
    }

    /// Versions in start-date order
    #[must_use]
    pub fn versions(&self) -> &[ParameterVersion] {
        &self.versions
    }

    /// Whether the timeline has no versions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
