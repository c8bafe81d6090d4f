// ABOUTME: Raw daily fact storage, read by materialization and written only by ingestion
// ABOUTME: Upserts per date plus range reads and the boundary queries used for range planning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use super::{Database, TransactionGuard};
use crate::errors::{AppError, AppResult};
use crate::models::DailyFact;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use std::collections::BTreeMap;
use tracing::debug;

const UPSERT_FACT: &str = r"
    INSERT INTO daily_facts (
        fact_date, intake_kcal, protein_g, carbohydrate_g, fat_g, fiber_g,
        exercise_kcal, body_weight_kg, fat_mass_kg, fat_free_mass_kg, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT(fact_date) DO UPDATE SET
        intake_kcal = excluded.intake_kcal,
        protein_g = excluded.protein_g,
        carbohydrate_g = excluded.carbohydrate_g,
        fat_g = excluded.fat_g,
        fiber_g = excluded.fiber_g,
        exercise_kcal = excluded.exercise_kcal,
        body_weight_kg = excluded.body_weight_kg,
        fat_mass_kg = excluded.fat_mass_kg,
        fat_free_mass_kg = excluded.fat_free_mass_kg,
        updated_at = excluded.updated_at
";

fn bind_fact<'q>(
    fact: &'q DailyFact,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    sqlx::query(UPSERT_FACT)
        .bind(fact.date)
        .bind(fact.intake_kcal)
        .bind(fact.protein_g)
        .bind(fact.carbohydrate_g)
        .bind(fact.fat_g)
        .bind(fact.fiber_g)
        .bind(fact.exercise_kcal)
        .bind(fact.body_weight_kg)
        .bind(fact.fat_mass_kg)
        .bind(fact.fat_free_mass_kg)
        .bind(Utc::now())
}

fn row_to_fact(row: &SqliteRow) -> AppResult<DailyFact> {
    Ok(DailyFact {
        date: row
            .try_get("fact_date")
            .map_err(|e| AppError::database(format!("Invalid fact_date: {e}")))?,
        intake_kcal: row.get("intake_kcal"),
        protein_g: row.get("protein_g"),
        carbohydrate_g: row.get("carbohydrate_g"),
        fat_g: row.get("fat_g"),
        fiber_g: row.get("fiber_g"),
        exercise_kcal: row.get("exercise_kcal"),
        body_weight_kg: row.get("body_weight_kg"),
        fat_mass_kg: row.get("fat_mass_kg"),
        fat_free_mass_kg: row.get("fat_free_mass_kg"),
    })
}

impl Database {
    /// Insert or replace the fact for one date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert_daily_fact(&self, fact: &DailyFact) -> AppResult<()> {
        bind_fact(fact)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to upsert fact {}: {e}", fact.date)))?;
        Ok(())
    }

    /// Insert or replace many facts in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; nothing is written in that case
    pub async fn upsert_daily_facts(&self, facts: &[DailyFact]) -> AppResult<usize> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        let mut guard = TransactionGuard::new(tx);

        for fact in facts {
            bind_fact(fact)
                .execute(guard.executor()?)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to upsert fact {}: {e}", fact.date))
                })?;
        }

        guard.commit().await?;
        debug!(count = facts.len(), "Daily facts upserted");
        Ok(facts.len())
    }

    /// Facts in `[start, end]` keyed by date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_daily_facts(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<BTreeMap<NaiveDate, DailyFact>> {
        let rows = sqlx::query(
            r"
            SELECT fact_date, intake_kcal, protein_g, carbohydrate_g, fat_g, fiber_g,
                   exercise_kcal, body_weight_kg, fat_mass_kg, fat_free_mass_kg
            FROM daily_facts
            WHERE fact_date >= $1 AND fact_date <= $2
            ORDER BY fact_date ASC
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load daily facts: {e}")))?;

        rows.iter()
            .map(|row| row_to_fact(row).map(|fact| (fact.date, fact)))
            .collect()
    }

    /// Date of the most recent raw fact
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn latest_fact_date(&self) -> AppResult<Option<NaiveDate>> {
        let row = sqlx::query("SELECT MAX(fact_date) AS latest FROM daily_facts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query latest fact date: {e}")))?;
        Ok(row.get("latest"))
    }

    /// Earliest date carrying both fat mass and fat-free mass
    ///
    /// A from-scratch rebuild starts here so both metrics can be seeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn earliest_complete_body_composition_date(&self) -> AppResult<Option<NaiveDate>> {
        let row = sqlx::query(
            r"
            SELECT MIN(fact_date) AS earliest
            FROM daily_facts
            WHERE fat_mass_kg IS NOT NULL AND fat_free_mass_kg IS NOT NULL
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query earliest fact date: {e}")))?;
        Ok(row.get("earliest"))
    }
}
