// ABOUTME: Effective-dated coefficient set applied by the smoother and derived metrics
// ABOUTME: Validation of coefficient domains and date coverage checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::BodyMetric;
use crate::errors::{AppError, AppResult};

/// Immutable parameter set effective from `effective_start_date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVersion {
    /// Stable identifier referenced by materialized rows
    pub version_id: String,
    /// First date this version applies to
    pub effective_start_date: NaiveDate,
    /// Last date this version applies to; open-ended when `None`
    pub effective_end_date: Option<NaiveDate>,
    /// EMA smoothing factor for fat mass
    pub alpha_fat_mass: f64,
    /// EMA smoothing factor for lean mass
    pub alpha_lean_mass: f64,
    /// BMR intercept (kcal/day)
    pub bmr_intercept_kcal: f64,
    /// BMR slope per kg of lean mass
    pub bmr_slope_kcal_per_kg_lean: f64,
    /// Fraction of exercise energy offset by compensation
    pub exercise_compensation_fraction: f64,
    /// Energy stored per kg of fat mass (kcal/kg)
    pub energy_density_kcal_per_kg_fat: f64,
}

impl ParameterVersion {
    /// Whether this version's effective window contains `date`
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.effective_start_date <= date
            && self.effective_end_date.is_none_or(|end| date <= end)
    }

    /// Smoothing factor for a metric
    #[must_use]
    pub const fn alpha_for(&self, metric: BodyMetric) -> f64 {
        match metric {
            BodyMetric::FatMass => self.alpha_fat_mass,
            BodyMetric::FatFreeMass => self.alpha_lean_mass,
        }
    }

    /// Check coefficient domains and the date window
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the first offending field
    pub fn validate(&self) -> AppResult<()> {
        if self.version_id.trim().is_empty() {
            return Err(AppError::invalid_input("version_id must not be empty"));
        }
        for (name, alpha) in [
            ("alpha_fat_mass", self.alpha_fat_mass),
            ("alpha_lean_mass", self.alpha_lean_mass),
        ] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(AppError::invalid_input(format!(
                    "{name} must be in (0, 1], got {alpha}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.exercise_compensation_fraction) {
            return Err(AppError::invalid_input(format!(
                "exercise_compensation_fraction must be in [0, 1), got {}",
                self.exercise_compensation_fraction
            )));
        }
        if !self.energy_density_kcal_per_kg_fat.is_finite()
            || self.energy_density_kcal_per_kg_fat <= 0.0
        {
            return Err(AppError::invalid_input(format!(
                "energy_density_kcal_per_kg_fat must be positive, got {}",
                self.energy_density_kcal_per_kg_fat
            )));
        }
        if !self.bmr_intercept_kcal.is_finite() || !self.bmr_slope_kcal_per_kg_lean.is_finite() {
            return Err(AppError::invalid_input("BMR coefficients must be finite"));
        }
        if let Some(end) = self.effective_end_date {
            if end < self.effective_start_date {
                return Err(AppError::invalid_input(format!(
                    "effective_end_date {end} precedes effective_start_date {}",
                    self.effective_start_date
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version() -> ParameterVersion {
        ParameterVersion {
            version_id: "v1".into(),
            effective_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            effective_end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
            alpha_fat_mass: 0.25,
            alpha_lean_mass: 0.1,
            bmr_intercept_kcal: 370.0,
            bmr_slope_kcal_per_kg_lean: 21.6,
            exercise_compensation_fraction: 0.2,
            energy_density_kcal_per_kg_fat: 7700.0,
        }
    }

    #[test]
    fn test_covers_is_inclusive_on_both_ends() {
        let v = version();
        assert!(v.covers(v.effective_start_date));
        assert!(v.covers(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap_or_default()));
        assert!(!v.covers(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap_or_default()));
        assert!(!v.covers(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default()));
    }

    #[test]
    fn test_validate_rejects_out_of_domain_coefficients() {
        let mut v = version();
        assert!(v.validate().is_ok());

        v.alpha_fat_mass = 0.0;
        assert!(v.validate().is_err());

        let mut v = version();
        v.exercise_compensation_fraction = 1.0;
        assert!(v.validate().is_err());

        let mut v = version();
        v.effective_end_date = NaiveDate::from_ymd_opt(2023, 6, 1);
        assert!(v.validate().is_err());
    }
}
