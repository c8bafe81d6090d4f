// ABOUTME: Materialized daily series storage with atomic strip-and-replace of a date range
// ABOUTME: Output rows and the run's new audit entries are committed together or not at all
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use super::{parse_uuid, Database, SqliteTransactionGuard};
use crate::errors::{AppError, AppResult};
use crate::models::{DateRange, MaterializedDay, OutlierAudit};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

const SELECT_COLUMNS: &str = r"
    SELECT fact_date, fat_mass_kg, lean_mass_kg, fat_mass_variance, bmr_kcal,
           compensated_exercise_kcal, net_energy_kcal, parameter_version_id,
           computed_at, run_id
    FROM materialized_days
";

/// One strip-and-replace write
#[derive(Debug, Clone, Copy)]
pub struct ReplaceRangeRequest<'a> {
    /// Span whose existing rows are deleted
    pub range: DateRange,
    /// Replacement rows, all inside `range`
    pub rows: &'a [MaterializedDay],
    /// Exclusions recorded by this run
    pub audits: &'a [OutlierAudit],
}

fn row_to_day(row: &SqliteRow) -> AppResult<MaterializedDay> {
    let run_id: String = row.get("run_id");
    Ok(MaterializedDay {
        date: row
            .try_get("fact_date")
            .map_err(|e| AppError::database(format!("Invalid fact_date: {e}")))?,
        fat_mass_kg: row.get("fat_mass_kg"),
        lean_mass_kg: row.get("lean_mass_kg"),
        fat_mass_variance: row.get("fat_mass_variance"),
        bmr_kcal: row.get("bmr_kcal"),
        compensated_exercise_kcal: row.get("compensated_exercise_kcal"),
        net_energy_kcal: row.get("net_energy_kcal"),
        parameter_version_id: row.get("parameter_version_id"),
        computed_at: row
            .try_get("computed_at")
            .map_err(|e| AppError::database(format!("Invalid computed_at: {e}")))?,
        run_id: parse_uuid(&run_id, "materialized_days.run_id")?,
    })
}

async fn write_range(
    guard: &mut SqliteTransactionGuard<'_>,
    request: &ReplaceRangeRequest<'_>,
) -> AppResult<()> {
    sqlx::query("DELETE FROM materialized_days WHERE fact_date >= $1 AND fact_date <= $2")
        .bind(request.range.start())
        .bind(request.range.end())
        .execute(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to strip materialized range: {e}")))?;

    for day in request.rows {
        sqlx::query(
            r"
            INSERT INTO materialized_days (
                fact_date, fat_mass_kg, lean_mass_kg, fat_mass_variance, bmr_kcal,
                compensated_exercise_kcal, net_energy_kcal, parameter_version_id,
                computed_at, run_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(day.date)
        .bind(day.fat_mass_kg)
        .bind(day.lean_mass_kg)
        .bind(day.fat_mass_variance)
        .bind(day.bmr_kcal)
        .bind(day.compensated_exercise_kcal)
        .bind(day.net_energy_kcal)
        .bind(&day.parameter_version_id)
        .bind(day.computed_at)
        .bind(day.run_id.to_string())
        .execute(guard.executor()?)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to insert materialized day {}: {e}", day.date))
        })?;
    }

    for audit in request.audits {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO outlier_audit (
                fact_date, metric, original_value, rule, reason, run_id, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(audit.date)
        .bind(audit.metric.as_str())
        .bind(audit.original_value)
        .bind(audit.rule.as_str())
        .bind(&audit.reason)
        .bind(audit.run_id.to_string())
        .bind(audit.recorded_at)
        .execute(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to record outlier audit: {e}")))?;
    }
    Ok(())
}

impl Database {
    /// Date of the most recent materialized row
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn latest_materialized_date(&self) -> AppResult<Option<NaiveDate>> {
        let row = sqlx::query("SELECT MAX(fact_date) AS latest FROM materialized_days")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to query latest materialized date: {e}"))
            })?;
        Ok(row.get("latest"))
    }

    /// Date of the oldest materialized row
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn earliest_materialized_date(&self) -> AppResult<Option<NaiveDate>> {
        let row = sqlx::query("SELECT MIN(fact_date) AS earliest FROM materialized_days")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::database(format!("Failed to query earliest materialized date: {e}"))
            })?;
        Ok(row.get("earliest"))
    }

    /// Materialized row for one date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_materialized_day(&self, date: NaiveDate) -> AppResult<Option<MaterializedDay>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE fact_date = $1"))
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get materialized day: {e}")))?;

        row.as_ref().map(row_to_day).transpose()
    }

    /// Materialized rows in `[start, end]`, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_materialized_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<MaterializedDay>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE fact_date >= $1 AND fact_date <= $2 ORDER BY fact_date ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load materialized days: {e}")))?;

        rows.iter().map(row_to_day).collect()
    }

    /// Delete every row in the range and insert the replacements in one transaction
    ///
    /// Rows outside the range are untouched. Audit entries that already exist are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if a row falls outside the range or any write fails;
    /// the transaction is rolled back and the prior rows survive
    pub async fn replace_materialized_range(
        &self,
        request: &ReplaceRangeRequest<'_>,
    ) -> AppResult<u64> {
        if let Some(stray) = request
            .rows
            .iter()
            .find(|day| !request.range.contains(day.date))
        {
            return Err(AppError::invalid_input(format!(
                "Materialized day {} lies outside {}",
                stray.date, request.range
            )));
        }

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        let mut guard = SqliteTransactionGuard::new(tx);

        write_range(&mut guard, request).await?;
        guard.commit().await?;

        debug!(
            range = %request.range,
            rows = request.rows.len(),
            audits = request.audits.len(),
            "Materialized range replaced"
        );
        Ok(request.rows.len() as u64)
    }

    /// Number of materialized rows computed with a parameter version
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn count_rows_for_version(&self, version_id: &str) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS referencing FROM materialized_days WHERE parameter_version_id = $1",
        )
        .bind(version_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count version references: {e}")))?;
        Ok(row.get("referencing"))
    }
}
