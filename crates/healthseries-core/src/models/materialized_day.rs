// ABOUTME: Persisted materialized day row and the smoother state used to seed a range
// ABOUTME: Mass values keep full precision; energy values are whole kcal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One derived row per date; always recomputable from facts and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedDay {
    /// Calendar date
    pub date: NaiveDate,
    /// Smoothed fat mass (kg)
    pub fat_mass_kg: f64,
    /// Smoothed lean mass (kg)
    pub lean_mass_kg: f64,
    /// Kalman posterior variance for fat mass, when the Kalman estimator ran
    pub fat_mass_variance: Option<f64>,
    /// Basal metabolic rate (kcal)
    pub bmr_kcal: i64,
    /// Exercise energy after compensation (kcal)
    pub compensated_exercise_kcal: i64,
    /// Intake minus compensated exercise minus BMR (kcal)
    pub net_energy_kcal: i64,
    /// Parameter version applied to this date
    pub parameter_version_id: String,
    /// When the row was computed
    pub computed_at: DateTime<Utc>,
    /// Run that wrote the row
    pub run_id: Uuid,
}

/// Smoother accumulator carried across days
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedState {
    /// Fat mass (kg)
    pub fat_mass_kg: f64,
    /// Lean mass (kg)
    pub lean_mass_kg: f64,
    /// Fat-mass variance when seeding the Kalman estimator
    pub fat_mass_variance: Option<f64>,
}

impl SeedState {
    /// Seed without a variance; the Kalman estimator starts from its cold variance
    #[must_use]
    pub const fn new(fat_mass_kg: f64, lean_mass_kg: f64) -> Self {
        Self {
            fat_mass_kg,
            lean_mass_kg,
            fat_mass_variance: None,
        }
    }
}

impl From<&MaterializedDay> for SeedState {
    fn from(day: &MaterializedDay) -> Self {
        Self {
            fat_mass_kg: day.fat_mass_kg,
            lean_mass_kg: day.lean_mass_kg,
            fat_mass_variance: day.fat_mass_variance,
        }
    }
}
