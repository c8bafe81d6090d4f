// ABOUTME: Effective-dated parameter version storage
// ABOUTME: Create, supersede (closing the prior version) and guarded delete of coefficient sets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use super::{Database, TransactionGuard};
use crate::errors::{AppError, AppResult};
use crate::models::ParameterVersion;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::info;

const SELECT_COLUMNS: &str = r"
    SELECT version_id, effective_start_date, effective_end_date, alpha_fat_mass,
           alpha_lean_mass, bmr_intercept_kcal, bmr_slope_kcal_per_kg_lean,
           exercise_compensation_fraction, energy_density_kcal_per_kg_fat
    FROM parameter_versions
";

fn row_to_version(row: &SqliteRow) -> AppResult<ParameterVersion> {
    Ok(ParameterVersion {
        version_id: row.get("version_id"),
        effective_start_date: row
            .try_get("effective_start_date")
            .map_err(|e| AppError::database(format!("Invalid effective_start_date: {e}")))?,
        effective_end_date: row
            .try_get("effective_end_date")
            .map_err(|e| AppError::database(format!("Invalid effective_end_date: {e}")))?,
        alpha_fat_mass: row.get("alpha_fat_mass"),
        alpha_lean_mass: row.get("alpha_lean_mass"),
        bmr_intercept_kcal: row.get("bmr_intercept_kcal"),
        bmr_slope_kcal_per_kg_lean: row.get("bmr_slope_kcal_per_kg_lean"),
        exercise_compensation_fraction: row.get("exercise_compensation_fraction"),
        energy_density_kcal_per_kg_fat: row.get("energy_density_kcal_per_kg_fat"),
    })
}

/// Insert inside an open transaction, mapping uniqueness failures to conflicts
async fn insert_version(conn: &mut SqliteConnection, version: &ParameterVersion) -> AppResult<()> {
    let existing = sqlx::query(
        "SELECT version_id FROM parameter_versions WHERE version_id = $1 OR effective_start_date = $2",
    )
    .bind(&version.version_id)
    .bind(version.effective_start_date)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::database(format!("Failed to check parameter versions: {e}")))?;

    if let Some(row) = existing {
        let clashing: String = row.get("version_id");
        return Err(if clashing == version.version_id {
            AppError::already_exists(format!("Parameter version {}", version.version_id))
        } else {
            AppError::conflict(format!(
                "Parameter version {clashing} already starts on {}",
                version.effective_start_date
            ))
        });
    }

    sqlx::query(
        r"
        INSERT INTO parameter_versions (
            version_id, effective_start_date, effective_end_date, alpha_fat_mass,
            alpha_lean_mass, bmr_intercept_kcal, bmr_slope_kcal_per_kg_lean,
            exercise_compensation_fraction, energy_density_kcal_per_kg_fat, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(&version.version_id)
    .bind(version.effective_start_date)
    .bind(version.effective_end_date)
    .bind(version.alpha_fat_mass)
    .bind(version.alpha_lean_mass)
    .bind(version.bmr_intercept_kcal)
    .bind(version.bmr_slope_kcal_per_kg_lean)
    .bind(version.exercise_compensation_fraction)
    .bind(version.energy_density_kcal_per_kg_fat)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        AppError::database(format!(
            "Failed to insert parameter version {}: {e}",
            version.version_id
        ))
    })?;
    Ok(())
}

impl Database {
    /// All parameter versions ordered by effective start date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_parameter_versions(&self) -> AppResult<Vec<ParameterVersion>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} ORDER BY effective_start_date ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list parameter versions: {e}")))?;

        rows.iter().map(row_to_version).collect()
    }

    /// Get a parameter version by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_parameter_version(
        &self,
        version_id: &str,
    ) -> AppResult<Option<ParameterVersion>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE version_id = $1"))
            .bind(version_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get parameter version: {e}")))?;

        row.as_ref().map(row_to_version).transpose()
    }

    /// Create a new parameter version
    ///
    /// # Errors
    ///
    /// Returns an error if the coefficients are invalid, the id already exists,
    /// another version starts on the same date, or the insert fails
    pub async fn create_parameter_version(&self, version: &ParameterVersion) -> AppResult<()> {
        version.validate()?;

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        let mut guard = TransactionGuard::new(tx);
        insert_version(guard.executor()?, version).await?;
        guard.commit().await?;

        info!(
            version_id = %version.version_id,
            effective_start = %version.effective_start_date,
            "Parameter version created"
        );
        Ok(())
    }

    /// Close `prior_id` the day before `next` starts and insert `next`, atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the prior version is missing, `next` does not start
    /// strictly after it, `next` is invalid, or a write fails
    pub async fn supersede_parameter_version(
        &self,
        prior_id: &str,
        next: &ParameterVersion,
    ) -> AppResult<()> {
        next.validate()?;

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        let mut guard = TransactionGuard::new(tx);

        let prior_row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE version_id = $1"))
            .bind(prior_id)
            .fetch_optional(guard.executor()?)
            .await
            .map_err(|e| AppError::database(format!("Failed to get parameter version: {e}")))?
            .ok_or_else(|| AppError::not_found(format!("Parameter version {prior_id}")))?;
        let prior = row_to_version(&prior_row)?;

        if next.effective_start_date <= prior.effective_start_date {
            return Err(AppError::invalid_input(format!(
                "Superseding version must start after {} ({})",
                prior.effective_start_date, prior.version_id
            )));
        }
        let prior_end: NaiveDate = next.effective_start_date.pred_opt().ok_or_else(|| {
            AppError::out_of_range("Superseding start date has no predecessor")
        })?;

        sqlx::query(
            "UPDATE parameter_versions SET effective_end_date = $1 WHERE version_id = $2",
        )
        .bind(prior_end)
        .bind(prior_id)
        .execute(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to close parameter version: {e}")))?;

        insert_version(guard.executor()?, next).await?;
        guard.commit().await?;

        info!(
            prior = %prior_id,
            prior_end = %prior_end,
            next = %next.version_id,
            "Parameter version superseded"
        );
        Ok(())
    }

    /// Delete a parameter version that no materialized row references
    ///
    /// # Errors
    ///
    /// Returns `ResourceLocked` while materialized rows reference the version,
    /// `ResourceNotFound` if it does not exist, or a database error
    pub async fn delete_parameter_version(&self, version_id: &str) -> AppResult<()> {
        let referencing = self.count_rows_for_version(version_id).await?;
        if referencing > 0 {
            return Err(AppError::locked(format!(
                "Parameter version {version_id} is referenced by {referencing} materialized rows"
            )));
        }

        let result = sqlx::query("DELETE FROM parameter_versions WHERE version_id = $1")
            .bind(version_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete parameter version: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Parameter version {version_id}")));
        }
        info!(version_id, "Parameter version deleted");
        Ok(())
    }
}
