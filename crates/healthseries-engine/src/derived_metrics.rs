// ABOUTME: Derived energy metrics from smoothed lean mass and raw intake and exercise
// ABOUTME: BMR from lean mass, compensated exercise, and net energy balance in kcal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use serde::{Deserialize, Serialize};

use healthseries_core::models::ParameterVersion;

/// Unrounded daily energy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// `intercept + slope * lean_mass`
    pub bmr_kcal: f64,
    /// `(1 - c) * exercise`
    pub compensated_exercise_kcal: f64,
    /// `intake - compensated_exercise - bmr`
    pub net_energy_kcal: f64,
}

impl DerivedMetrics {
    /// Compute metrics for one day; missing intake or exercise counts as zero
    #[must_use]
    pub fn compute(
        smoothed_lean_kg: f64,
        raw_intake_kcal: Option<f64>,
        raw_exercise_kcal: Option<f64>,
        params: &ParameterVersion,
    ) -> Self {
        let bmr_kcal = params
            .bmr_slope_kcal_per_kg_lean
            .mul_add(smoothed_lean_kg, params.bmr_intercept_kcal);
        let compensated_exercise_kcal =
            (1.0 - params.exercise_compensation_fraction) * raw_exercise_kcal.unwrap_or(0.0);
        let net_energy_kcal = raw_intake_kcal.unwrap_or(0.0) - compensated_exercise_kcal - bmr_kcal;

        Self {
            bmr_kcal,
            compensated_exercise_kcal,
            net_energy_kcal,
        }
    }

    /// Whole-kcal values for persistence: `(bmr, compensated_exercise, net_energy)`
    #[must_use]
    pub fn rounded(&self) -> (i64, i64, i64) {
        (
            round_kcal(self.bmr_kcal),
            round_kcal(self.compensated_exercise_kcal),
            round_kcal(self.net_energy_kcal),
        )
    }
}

/// Round to the nearest whole kcal, half away from zero
#[must_use]
pub fn round_kcal(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params(intercept: f64, slope: f64, compensation: f64) -> ParameterVersion {
        ParameterVersion {
            version_id: "v1".into(),
            effective_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            effective_end_date: None,
            alpha_fat_mass: 0.25,
            alpha_lean_mass: 0.1,
            bmr_intercept_kcal: intercept,
            bmr_slope_kcal_per_kg_lean: slope,
            exercise_compensation_fraction: compensation,
            energy_density_kcal_per_kg_fat: 7700.0,
        }
    }

    #[test]
    fn test_net_energy_arithmetic() {
        // BMR 1600 from intercept 1600 with zero slope
        let metrics = DerivedMetrics::compute(60.0, Some(2000.0), Some(500.0), &params(1600.0, 0.0, 0.2));
        assert_eq!(metrics.rounded(), (1600, 400, 0));
    }

    #[test]
    fn test_missing_intake_and_exercise_count_as_zero() {
        let metrics = DerivedMetrics::compute(50.0, None, None, &params(370.0, 21.6, 0.2));
        assert!((metrics.bmr_kcal - 1450.0).abs() < 1e-9);
        assert!(metrics.compensated_exercise_kcal.abs() < f64::EPSILON);
        assert!((metrics.net_energy_kcal + 1450.0).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_happens_only_on_request() {
        let metrics = DerivedMetrics::compute(50.02, Some(2000.0), None, &params(370.0, 21.6, 0.0));
        assert!((metrics.bmr_kcal - 1450.432).abs() < 1e-9);
        assert_eq!(metrics.rounded().0, 1450);
        assert_eq!(round_kcal(-0.5), -1);
    }
}
