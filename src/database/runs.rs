// ABOUTME: Materialization run log
// ABOUTME: One row per run with range, state, counts, timing, error detail and engine config
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use super::{parse_uuid, Database};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{MaterializationRun, RunState};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

const SELECT_COLUMNS: &str = r"
    SELECT run_id, mode, requested_start, requested_end, start_date, end_date, state,
           rows_processed, outliers_flagged, started_at, completed_at, error_code,
           error_detail, engine_config
    FROM materialization_runs
";

fn row_to_run(row: &SqliteRow) -> AppResult<MaterializationRun> {
    let run_id: String = row.get("run_id");
    let mode: String = row.get("mode");
    let state: String = row.get("state");
    let engine_config: String = row.get("engine_config");
    let date_column = |column: &str| {
        row.try_get(column)
            .map_err(|e| AppError::database(format!("Invalid {column}: {e}")))
    };

    Ok(MaterializationRun {
        run_id: parse_uuid(&run_id, "materialization_runs.run_id")?,
        mode: mode.parse()?,
        requested_start: date_column("requested_start")?,
        requested_end: date_column("requested_end")?,
        start_date: date_column("start_date")?,
        end_date: date_column("end_date")?,
        state: state.parse()?,
        rows_processed: row.get("rows_processed"),
        outliers_flagged: row.get("outliers_flagged"),
        started_at: row
            .try_get("started_at")
            .map_err(|e| AppError::database(format!("Invalid started_at: {e}")))?,
        completed_at: row
            .try_get("completed_at")
            .map_err(|e| AppError::database(format!("Invalid completed_at: {e}")))?,
        error_code: row.get("error_code"),
        error_detail: row.get("error_detail"),
        engine_config: serde_json::from_str(&engine_config)?,
    })
}

impl Database {
    /// Record a new run
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn insert_run(&self, run: &MaterializationRun) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO materialization_runs (
                run_id, mode, requested_start, requested_end, start_date, end_date, state,
                rows_processed, outliers_flagged, started_at, completed_at, error_code,
                error_detail, engine_config
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(run.run_id.to_string())
        .bind(run.mode.as_str())
        .bind(run.requested_start)
        .bind(run.requested_end)
        .bind(run.start_date)
        .bind(run.end_date)
        .bind(run.state.as_str())
        .bind(run.rows_processed)
        .bind(run.outliers_flagged)
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(&run.error_code)
        .bind(&run.error_detail)
        .bind(run.engine_config.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record run {}: {e}", run.run_id)))?;
        Ok(())
    }

    /// Move a run to a non-terminal state
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown run, or a database error
    pub async fn update_run_state(&self, run_id: Uuid, state: RunState) -> AppResult<()> {
        let result = sqlx::query("UPDATE materialization_runs SET state = $1 WHERE run_id = $2")
            .bind(state.as_str())
            .bind(run_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update run state: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Materialization run {run_id}")));
        }
        Ok(())
    }

    /// Mark a run completed with its counts
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn record_run_completion(
        &self,
        run_id: Uuid,
        rows_processed: u64,
        outliers_flagged: u64,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE materialization_runs
            SET state = $1, rows_processed = $2, outliers_flagged = $3, completed_at = $4
            WHERE run_id = $5
            ",
        )
        .bind(RunState::Completed.as_str())
        .bind(i64::try_from(rows_processed).unwrap_or(i64::MAX))
        .bind(i64::try_from(outliers_flagged).unwrap_or(i64::MAX))
        .bind(Utc::now())
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to complete run {run_id}: {e}")))?;
        Ok(())
    }

    /// Mark a run failed with the error that stopped it
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn record_run_failure(&self, run_id: Uuid, error: &AppError) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE materialization_runs
            SET state = $1, completed_at = $2, error_code = $3, error_detail = $4
            WHERE run_id = $5
            ",
        )
        .bind(RunState::Failed.as_str())
        .bind(Utc::now())
        .bind(error.code.as_str())
        .bind(&error.message)
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record failure of run {run_id}: {e}")))?;
        Ok(())
    }

    /// Close runs left non-terminal by a run that stopped mid-way
    ///
    /// Runs for which `is_active` holds are still executing and are left alone;
    /// every other non-terminal run is marked failed with `RUN_ABANDONED`. A run
    /// that reaches a terminal state concurrently keeps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn fail_abandoned_runs(
        &self,
        is_active: impl Fn(Uuid) -> bool + Send,
    ) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT run_id FROM materialization_runs WHERE state NOT IN ($1, $2)")
            .bind(RunState::Completed.as_str())
            .bind(RunState::Failed.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list unfinished runs: {e}")))?;

        let mut abandoned = Vec::new();
        for row in &rows {
            let run_id: String = row.get("run_id");
            let run_id = parse_uuid(&run_id, "materialization_runs.run_id")?;
            if is_active(run_id) {
                continue;
            }
            let result = sqlx::query(
                r"
                UPDATE materialization_runs
                SET state = $1, completed_at = $2, error_code = $3, error_detail = $4
                WHERE run_id = $5 AND state NOT IN ($6, $7)
                ",
            )
            .bind(RunState::Failed.as_str())
            .bind(Utc::now())
            .bind(ErrorCode::RunAbandoned.as_str())
            .bind("run stopped before reaching a terminal state")
            .bind(run_id.to_string())
            .bind(RunState::Completed.as_str())
            .bind(RunState::Failed.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to close run {run_id}: {e}")))?;
            if result.rows_affected() > 0 {
                abandoned.push(run_id);
            }
        }
        Ok(abandoned)
    }

    /// Get a run by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_run(&self, run_id: Uuid) -> AppResult<Option<MaterializationRun>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE run_id = $1"))
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get run: {e}")))?;

        row.as_ref().map(row_to_run).transpose()
    }

    /// Most recent runs first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_runs(&self, limit: u32) -> AppResult<Vec<MaterializationRun>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} ORDER BY started_at DESC, run_id ASC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list runs: {e}")))?;

        rows.iter().map(row_to_run).collect()
    }
}
