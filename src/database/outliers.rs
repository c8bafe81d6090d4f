// ABOUTME: Outlier audit trail and reviewer admissions
// ABOUTME: Audit entries exclude a reading on every rebuild; reversal swaps the entry for an admission
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use super::{parse_uuid, Database, TransactionGuard};
use crate::engine::ReadingKey;
use crate::errors::{AppError, AppResult};
use crate::models::{BodyMetric, DateRange, OutlierAdmission, OutlierAudit};
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashSet;
use tracing::info;

fn row_to_audit(row: &SqliteRow) -> AppResult<OutlierAudit> {
    let metric: String = row.get("metric");
    let rule: String = row.get("rule");
    let run_id: String = row.get("run_id");
    Ok(OutlierAudit {
        date: row
            .try_get("fact_date")
            .map_err(|e| AppError::database(format!("Invalid fact_date: {e}")))?,
        metric: metric.parse()?,
        original_value: row.get("original_value"),
        rule: rule.parse()?,
        reason: row.get("reason"),
        run_id: parse_uuid(&run_id, "outlier_audit.run_id")?,
        recorded_at: row
            .try_get("recorded_at")
            .map_err(|e| AppError::database(format!("Invalid recorded_at: {e}")))?,
    })
}

fn row_to_admission(row: &SqliteRow) -> AppResult<OutlierAdmission> {
    let metric: String = row.get("metric");
    Ok(OutlierAdmission {
        date: row
            .try_get("fact_date")
            .map_err(|e| AppError::database(format!("Invalid fact_date: {e}")))?,
        metric: metric.parse()?,
        reviewer: row.get("reviewer"),
        note: row.get("note"),
        admitted_at: row
            .try_get("admitted_at")
            .map_err(|e| AppError::database(format!("Invalid admitted_at: {e}")))?,
    })
}

fn rows_to_keys(rows: &[SqliteRow]) -> AppResult<HashSet<ReadingKey>> {
    rows.iter()
        .map(|row| {
            let metric: String = row.get("metric");
            let date: NaiveDate = row
                .try_get("fact_date")
                .map_err(|e| AppError::database(format!("Invalid fact_date: {e}")))?;
            Ok((date, metric.parse::<BodyMetric>()?))
        })
        .collect()
}

impl Database {
    /// Audit entries, optionally limited to a date range, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_outlier_audit(&self, range: Option<DateRange>) -> AppResult<Vec<OutlierAudit>> {
        let rows = sqlx::query(
            r"
            SELECT fact_date, metric, original_value, rule, reason, run_id, recorded_at
            FROM outlier_audit
            WHERE ($1 IS NULL OR fact_date >= $1) AND ($2 IS NULL OR fact_date <= $2)
            ORDER BY fact_date ASC, metric ASC
            ",
        )
        .bind(range.map(|r| r.start()))
        .bind(range.map(|r| r.end()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list outlier audit: {e}")))?;

        rows.iter().map(row_to_audit).collect()
    }

    /// (date, metric) pairs already excluded in `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn audit_keys(&self, start: NaiveDate, end: NaiveDate) -> AppResult<HashSet<ReadingKey>> {
        let rows = sqlx::query(
            "SELECT fact_date, metric FROM outlier_audit WHERE fact_date >= $1 AND fact_date <= $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load outlier audit keys: {e}")))?;

        rows_to_keys(&rows)
    }

    /// (date, metric) pairs a reviewer has admitted in `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn admission_keys(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<HashSet<ReadingKey>> {
        let rows = sqlx::query(
            "SELECT fact_date, metric FROM outlier_admissions WHERE fact_date >= $1 AND fact_date <= $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load admission keys: {e}")))?;

        rows_to_keys(&rows)
    }

    /// All reviewer admissions, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_admissions(&self) -> AppResult<Vec<OutlierAdmission>> {
        let rows = sqlx::query(
            r"
            SELECT fact_date, metric, reviewer, note, admitted_at
            FROM outlier_admissions
            ORDER BY fact_date ASC, metric ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list admissions: {e}")))?;

        rows.iter().map(row_to_admission).collect()
    }

    /// Reverse an exclusion: remove the audit entry and admit the reading
    ///
    /// The next rebuild covering `date` uses the raw value without re-running the rules.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if no audit entry exists for (date, metric),
    /// or a database error
    pub async fn reverse_exclusion(
        &self,
        date: NaiveDate,
        metric: BodyMetric,
        reviewer: &str,
        note: Option<&str>,
    ) -> AppResult<OutlierAdmission> {
        if reviewer.trim().is_empty() {
            return Err(AppError::invalid_input("reviewer must not be empty"));
        }

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;
        let mut guard = TransactionGuard::new(tx);

        let removed = sqlx::query("DELETE FROM outlier_audit WHERE fact_date = $1 AND metric = $2")
            .bind(date)
            .bind(metric.as_str())
            .execute(guard.executor()?)
            .await
            .map_err(|e| AppError::database(format!("Failed to remove audit entry: {e}")))?;

        if removed.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Outlier audit entry for {metric} on {date}"
            )));
        }

        let admission = OutlierAdmission {
            date,
            metric,
            reviewer: reviewer.to_owned(),
            note: note.map(ToOwned::to_owned),
            admitted_at: Utc::now(),
        };

        sqlx::query(
            r"
            INSERT OR REPLACE INTO outlier_admissions (fact_date, metric, reviewer, note, admitted_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(admission.date)
        .bind(admission.metric.as_str())
        .bind(&admission.reviewer)
        .bind(&admission.note)
        .bind(admission.admitted_at)
        .execute(guard.executor()?)
        .await
        .map_err(|e| AppError::database(format!("Failed to record admission: {e}")))?;

        guard.commit().await?;
        info!(%date, %metric, reviewer, "Outlier exclusion reversed");
        Ok(admission)
    }
}
