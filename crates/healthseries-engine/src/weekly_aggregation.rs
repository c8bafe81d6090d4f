// ABOUTME: Weekly roll-up of materialized days into Monday to Sunday snapshots
// ABOUTME: Compares predicted fat change from net energy with the smoothed trend
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use rayon::prelude::*;

use healthseries_core::constants::weekly::{
    DAYS_PER_WEEK, MIN_FAT_CHANGE_FOR_IMPLIED_DENSITY_KG,
};
use healthseries_core::errors::{AppError, AppResult};
use healthseries_core::models::{MaterializedDay, WeeklySnapshot};

use crate::parameter_timeline::ParameterTimeline;
use crate::statistics::mean;

/// Inputs for one week
#[derive(Debug, Clone)]
pub struct WeekInput {
    /// Monday
    pub week_start: NaiveDate,
    /// Materialized days of the week in date order
    pub days: Vec<MaterializedDay>,
    /// Recorded intake values for the week (days without intake omitted)
    pub recorded_intake_kcal: Vec<f64>,
}

/// Whether `date` is a Monday
#[must_use]
pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Sunday of the week starting `week_start`
#[must_use]
pub fn week_end(week_start: NaiveDate) -> Option<NaiveDate> {
    week_start.checked_add_days(Days::new((DAYS_PER_WEEK - 1) as u64))
}

/// Mondays whose full week lies inside `[first, last]`
#[must_use]
pub fn complete_week_starts(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let offset = (7 - first.weekday().num_days_from_monday()) % 7;
    let Some(first_monday) = first.checked_add_days(Days::new(u64::from(offset))) else {
        return Vec::new();
    };
    first_monday
        .iter_weeks()
        .take_while(|monday| week_end(*monday).is_some_and(|sunday| sunday <= last))
        .collect()
}

/// Builds weekly snapshots against the parameter timeline
#[derive(Debug, Clone, Copy)]
pub struct WeeklyAggregator<'a> {
    timeline: &'a ParameterTimeline,
}

impl<'a> WeeklyAggregator<'a> {
    /// Create an aggregator
    #[must_use]
    pub const fn new(timeline: &'a ParameterTimeline) -> Self {
        Self { timeline }
    }

    /// Aggregate one week
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `week_start` is not a Monday or the week is not fully materialized
    /// - `ResourceNotFound` if a day references a parameter version missing from the timeline
    pub fn aggregate(
        &self,
        input: &WeekInput,
        created_at: DateTime<Utc>,
    ) -> AppResult<WeeklySnapshot> {
        if !is_week_start(input.week_start) {
            return Err(AppError::invalid_input(format!(
                "week_start {} is a {}, expected Monday",
                input.week_start,
                input.week_start.weekday()
            )));
        }
        let sunday = week_end(input.week_start)
            .ok_or_else(|| AppError::invalid_input("week_start out of range"))?;

        let complete = input.days.len() == DAYS_PER_WEEK as usize
            && input
                .week_start
                .iter_days()
                .zip(&input.days)
                .all(|(expected, day)| day.date == expected);
        let (Some(first), Some(last)) = (input.days.first(), input.days.last()) else {
            return Err(AppError::invalid_input(format!(
                "week {} has no materialized days",
                input.week_start
            )));
        };
        if !complete {
            return Err(AppError::invalid_input(format!(
                "week {}..={} is not fully materialized ({} of {DAYS_PER_WEEK} days)",
                input.week_start,
                sunday,
                input.days.len()
            )));
        }

        let mut total_net_energy_kcal = 0_i64;
        let mut predicted_fat_change_kg = 0.0;
        let mut parameter_version_ids: Vec<String> = Vec::new();
        for day in &input.days {
            let version = self
                .timeline
                .get(&day.parameter_version_id)
                .ok_or_else(|| {
                    AppError::not_found(format!("Parameter version {}", day.parameter_version_id))
                })?;
            total_net_energy_kcal += day.net_energy_kcal;
            predicted_fat_change_kg += day.net_energy_kcal as f64 / version.energy_density_kcal_per_kg_fat;
            if !parameter_version_ids.contains(&day.parameter_version_id) {
                parameter_version_ids.push(day.parameter_version_id.clone());
            }
        }

        // Monday to Sunday spans six daily steps, driven by Monday..Saturday energy
        let fat_mass_change_kg = last.fat_mass_kg - first.fat_mass_kg;
        let stepped_net_energy_kcal: i64 = input.days[..input.days.len() - 1]
            .iter()
            .map(|day| day.net_energy_kcal)
            .sum();
        let implied_energy_density_kcal_per_kg = (fat_mass_change_kg.abs()
            >= MIN_FAT_CHANGE_FOR_IMPLIED_DENSITY_KG)
            .then(|| stepped_net_energy_kcal as f64 / fat_mass_change_kg);

        Ok(WeeklySnapshot {
            week_start: input.week_start,
            week_end: sunday,
            days: DAYS_PER_WEEK as u32,
            fat_mass_start_kg: first.fat_mass_kg,
            fat_mass_end_kg: last.fat_mass_kg,
            fat_mass_change_kg,
            lean_mass_start_kg: first.lean_mass_kg,
            lean_mass_end_kg: last.lean_mass_kg,
            mean_intake_kcal: mean(&input.recorded_intake_kcal),
            total_net_energy_kcal,
            predicted_fat_change_kg,
            implied_energy_density_kcal_per_kg,
            parameter_version_ids,
            created_at,
        })
    }

    /// Aggregate many independent weeks in parallel, preserving input order
    #[must_use]
    pub fn aggregate_all(
        &self,
        inputs: &[WeekInput],
        created_at: DateTime<Utc>,
    ) -> Vec<AppResult<WeeklySnapshot>> {
        inputs
            .par_iter()
            .map(|input| self.aggregate(input, created_at))
            .collect()
    }
}
