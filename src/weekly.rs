// ABOUTME: Weekly snapshot service turning completed Monday to Sunday spans into immutable records
// ABOUTME: Loads materialized days and recorded intake, aggregates, and inserts once per week
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::constants::weekly::DAYS_PER_WEEK;
use crate::database::Database;
use crate::engine::weekly_aggregation::{complete_week_starts, is_week_start, week_end};
use crate::engine::{ParameterTimeline, WeekInput, WeeklyAggregator};
use crate::errors::{AppError, AppResult};
use crate::models::WeeklySnapshot;

/// Creates weekly snapshots from the materialized series
#[derive(Clone)]
pub struct WeeklySnapshotService {
    database: Database,
}

impl WeeklySnapshotService {
    /// Create a service over a database
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }

    async fn load_week(&self, week_start: NaiveDate) -> AppResult<WeekInput> {
        let sunday = week_end(week_start)
            .ok_or_else(|| AppError::invalid_input("week_start out of range"))?;
        let days = self.database.get_materialized_days(week_start, sunday).await?;
        let recorded_intake_kcal = self
            .database
            .get_daily_facts(week_start, sunday)
            .await?
            .values()
            .filter_map(|fact| fact.intake_kcal)
            .collect();
        Ok(WeekInput {
            week_start,
            days,
            recorded_intake_kcal,
        })
    }

    async fn timeline(&self) -> AppResult<ParameterTimeline> {
        Ok(ParameterTimeline::new(
            self.database.list_parameter_versions().await?,
        ))
    }

    /// Snapshot the week starting on `week_start`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `week_start` is not a Monday or the week is not fully materialized
    /// - `ResourceAlreadyExists` if the week already has a snapshot
    pub async fn snapshot_week(&self, week_start: NaiveDate) -> AppResult<WeeklySnapshot> {
        if !is_week_start(week_start) {
            return Err(AppError::invalid_input(format!(
                "week_start {week_start} is not a Monday"
            )));
        }
        if self.database.get_weekly_snapshot(week_start).await?.is_some() {
            return Err(AppError::already_exists(format!(
                "Weekly snapshot for {week_start}"
            )));
        }

        let input = self.load_week(week_start).await?;
        let timeline = self.timeline().await?;
        let snapshot = WeeklyAggregator::new(&timeline).aggregate(&input, Utc::now())?;
        self.database.insert_weekly_snapshot(&snapshot).await?;

        info!(
            %week_start,
            fat_mass_change_kg = snapshot.fat_mass_change_kg,
            total_net_energy_kcal = snapshot.total_net_energy_kcal,
            "Weekly snapshot created"
        );
        Ok(snapshot)
    }

    /// Snapshot every fully materialized week that has no snapshot yet
    ///
    /// Weeks are aggregated in parallel and stored oldest first.
    ///
    /// # Errors
    ///
    /// Returns the first aggregation or database error; weeks stored before it are kept
    pub async fn snapshot_completed_weeks(&self) -> AppResult<Vec<WeeklySnapshot>> {
        let (Some(first), Some(last)) = (
            self.database.earliest_materialized_date().await?,
            self.database.latest_materialized_date().await?,
        ) else {
            return Ok(Vec::new());
        };

        let existing = self.database.snapshotted_week_starts().await?;
        let mut inputs = Vec::new();
        for week_start in complete_week_starts(first, last) {
            if existing.contains(&week_start) {
                continue;
            }
            let input = self.load_week(week_start).await?;
            if input.days.len() == DAYS_PER_WEEK as usize {
                inputs.push(input);
            } else {
                debug!(%week_start, days = input.days.len(), "Skipping incomplete week");
            }
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let timeline = self.timeline().await?;
        let created_at = Utc::now();
        let results = tokio::task::spawn_blocking(move || {
            WeeklyAggregator::new(&timeline).aggregate_all(&inputs, created_at)
        })
        .await
        .map_err(|e| AppError::internal(format!("Weekly aggregation task failed: {e}")))?;

        let mut created = Vec::with_capacity(results.len());
        for result in results {
            let snapshot = result?;
            self.database.insert_weekly_snapshot(&snapshot).await?;
            created.push(snapshot);
        }

        info!(weeks = created.len(), "Completed weeks snapshotted");
        Ok(created)
    }
}
