// ABOUTME: Immutable Monday to Sunday roll-up of the materialized series
// ABOUTME: Compares the energy-balance prediction against observed fat-mass change
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Weekly aggregate written once and never updated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySnapshot {
    /// Monday
    pub week_start: NaiveDate,
    /// Sunday
    pub week_end: NaiveDate,
    /// Materialized days included (always seven once written)
    pub days: u32,
    /// Smoothed fat mass on Monday (kg)
    pub fat_mass_start_kg: f64,
    /// Smoothed fat mass on Sunday (kg)
    pub fat_mass_end_kg: f64,
    /// Sunday minus Monday fat mass (kg)
    pub fat_mass_change_kg: f64,
    /// Smoothed lean mass on Monday (kg)
    pub lean_mass_start_kg: f64,
    /// Smoothed lean mass on Sunday (kg)
    pub lean_mass_end_kg: f64,
    /// Average daily intake (kcal), over days with a recorded intake
    pub mean_intake_kcal: Option<f64>,
    /// Sum of daily net energy (kcal)
    pub total_net_energy_kcal: i64,
    /// Net energy converted to fat mass with each day's energy density (kg)
    pub predicted_fat_change_kg: f64,
    /// Monday..Saturday net energy per kg of Monday to Sunday fat change, when the change is large enough
    pub implied_energy_density_kcal_per_kg: Option<f64>,
    /// Distinct parameter versions applied during the week
    pub parameter_version_ids: Vec<String>,
    /// When the snapshot was written
    pub created_at: DateTime<Utc>,
}
