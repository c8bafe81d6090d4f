// ABOUTME: Immutable weekly snapshot storage
// ABOUTME: Insert-once records keyed by the Monday that opens the week
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::WeeklySnapshot;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeSet;

const SELECT_COLUMNS: &str = r"
    SELECT week_start, week_end, days, fat_mass_start_kg, fat_mass_end_kg, fat_mass_change_kg,
           lean_mass_start_kg, lean_mass_end_kg, mean_intake_kcal, total_net_energy_kcal,
           predicted_fat_change_kg, implied_energy_density_kcal_per_kg,
           parameter_version_ids, created_at
    FROM weekly_snapshots
";

fn row_to_snapshot(row: &SqliteRow) -> AppResult<WeeklySnapshot> {
    let version_ids: String = row.get("parameter_version_ids");
    let days: i64 = row.get("days");
    Ok(WeeklySnapshot {
        week_start: row
            .try_get("week_start")
            .map_err(|e| AppError::database(format!("Invalid week_start: {e}")))?,
        week_end: row
            .try_get("week_end")
            .map_err(|e| AppError::database(format!("Invalid week_end: {e}")))?,
        days: u32::try_from(days)
            .map_err(|e| AppError::database(format!("Invalid snapshot day count: {e}")))?,
        fat_mass_start_kg: row.get("fat_mass_start_kg"),
        fat_mass_end_kg: row.get("fat_mass_end_kg"),
        fat_mass_change_kg: row.get("fat_mass_change_kg"),
        lean_mass_start_kg: row.get("lean_mass_start_kg"),
        lean_mass_end_kg: row.get("lean_mass_end_kg"),
        mean_intake_kcal: row.get("mean_intake_kcal"),
        total_net_energy_kcal: row.get("total_net_energy_kcal"),
        predicted_fat_change_kg: row.get("predicted_fat_change_kg"),
        implied_energy_density_kcal_per_kg: row.get("implied_energy_density_kcal_per_kg"),
        parameter_version_ids: serde_json::from_str(&version_ids)?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Invalid created_at: {e}")))?,
    })
}

impl Database {
    /// Store a snapshot; an existing snapshot for the week is never overwritten
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the week was already snapshotted,
    /// or a database error
    pub async fn insert_weekly_snapshot(&self, snapshot: &WeeklySnapshot) -> AppResult<()> {
        let version_ids = serde_json::to_string(&snapshot.parameter_version_ids)?;
        let result = sqlx::query(
            r"
            INSERT OR IGNORE INTO weekly_snapshots (
                week_start, week_end, days, fat_mass_start_kg, fat_mass_end_kg,
                fat_mass_change_kg, lean_mass_start_kg, lean_mass_end_kg, mean_intake_kcal,
                total_net_energy_kcal, predicted_fat_change_kg,
                implied_energy_density_kcal_per_kg, parameter_version_ids, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(snapshot.week_start)
        .bind(snapshot.week_end)
        .bind(i64::from(snapshot.days))
        .bind(snapshot.fat_mass_start_kg)
        .bind(snapshot.fat_mass_end_kg)
        .bind(snapshot.fat_mass_change_kg)
        .bind(snapshot.lean_mass_start_kg)
        .bind(snapshot.lean_mass_end_kg)
        .bind(snapshot.mean_intake_kcal)
        .bind(snapshot.total_net_energy_kcal)
        .bind(snapshot.predicted_fat_change_kg)
        .bind(snapshot.implied_energy_density_kcal_per_kg)
        .bind(version_ids)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert weekly snapshot: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::already_exists(format!(
                "Weekly snapshot for {}",
                snapshot.week_start
            )));
        }
        Ok(())
    }

    /// Snapshot for the week starting on `week_start`
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_weekly_snapshot(
        &self,
        week_start: NaiveDate,
    ) -> AppResult<Option<WeeklySnapshot>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE week_start = $1"))
            .bind(week_start)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get weekly snapshot: {e}")))?;

        row.as_ref().map(row_to_snapshot).transpose()
    }

    /// All snapshots, oldest week first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_weekly_snapshots(&self) -> AppResult<Vec<WeeklySnapshot>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY week_start ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list weekly snapshots: {e}")))?;

        rows.iter().map(row_to_snapshot).collect()
    }

    /// Week starts that already have a snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn snapshotted_week_starts(&self) -> AppResult<BTreeSet<NaiveDate>> {
        let rows = sqlx::query("SELECT week_start FROM weekly_snapshots")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list snapshot weeks: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("week_start")
                    .map_err(|e| AppError::database(format!("Invalid week_start: {e}")))
            })
            .collect()
    }
}
