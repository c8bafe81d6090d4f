// ABOUTME: Benchmark fixtures generating realistic daily body-composition histories
// ABOUTME: Deterministic data so measurements are reproducible between runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Benchmark fixtures for daily series.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use healthseries::engine::ParameterTimeline;
use healthseries::models::{DailyFact, ParameterVersion};

/// Predefined history lengths
#[derive(Debug, Clone, Copy)]
pub enum HistoryLength {
    /// One quarter
    Quarter,
    /// One year
    Year,
    /// Five years
    FiveYears,
}

impl HistoryLength {
    #[must_use]
    pub const fn days(self) -> i64 {
        match self {
            Self::Quarter => 90,
            Self::Year => 365,
            Self::FiveYears => 1825,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Quarter => "90d",
            Self::Year => "365d",
            Self::FiveYears => "1825d",
        }
    }
}

/// First generated date
#[must_use]
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 6).unwrap_or_default()
}

/// Facts for `days` consecutive days with slow fat loss, noise, gaps and an occasional spike
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn generate_facts(days: i64) -> BTreeMap<NaiveDate, DailyFact> {
    (0..days)
        .map(|offset| {
            let date = base_date() + Duration::days(offset);
            let noise = ((offset * 7919) % 11 - 5) as f64 * 0.08;
            let trend = -0.01 * offset as f64;
            let weigh_in = offset % 4 != 3;
            let spike = if offset % 97 == 50 { 9.0 } else { 0.0 };
            let fact = DailyFact {
                intake_kcal: (offset % 9 != 0).then_some(2000.0 + (offset % 5) as f64 * 60.0),
                exercise_kcal: (offset % 3 == 0).then_some(450.0),
                fat_mass_kg: weigh_in.then_some(24.0 + trend + noise + spike),
                fat_free_mass_kg: weigh_in.then_some(57.0 + noise / 2.0),
                body_weight_kg: weigh_in.then_some(81.0 + trend + noise),
                ..DailyFact::empty(date)
            };
            (date, fact)
        })
        .collect()
}

/// One version per year starting at the base date
#[must_use]
pub fn generate_timeline(days: i64) -> ParameterTimeline {
    let years = days / 365 + 1;
    let versions = (0..years)
        .map(|year| {
            let start = base_date() + Duration::days(year * 365);
            ParameterVersion {
                version_id: format!("y{year}"),
                effective_start_date: start,
                effective_end_date: (year + 1 < years)
                    .then(|| start + Duration::days(364)),
                alpha_fat_mass: 0.25,
                alpha_lean_mass: 0.1,
                bmr_intercept_kcal: 370.0,
                bmr_slope_kcal_per_kg_lean: 21.6,
                exercise_compensation_fraction: 0.2,
                energy_density_kcal_per_kg_fat: 7700.0,
            }
        })
        .collect();
    ParameterTimeline::new(versions)
}

/// Same version list, for seeding a database
#[must_use]
pub fn generate_versions(days: i64) -> Vec<ParameterVersion> {
    generate_timeline(days).versions().to_vec()
}
