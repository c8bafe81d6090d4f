// ABOUTME: SQLite persistence for daily facts, parameter versions, outlier audit and derived output
// ABOUTME: Owns the connection pool and the idempotent schema migration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! # Database Management
//!
//! Single-subject store. Every table is created with `CREATE TABLE IF NOT EXISTS`
//! so `migrate()` is safe to call on every start. UUIDs are stored as TEXT and
//! calendar dates as ISO-8601 TEXT, which keeps range predicates lexicographic.

mod daily_facts;
mod materialized;
mod outliers;
mod parameters;
mod runs;
/// RAII transaction guard and retry helper
pub mod transactions;
mod weekly_snapshots;

pub use materialized::ReplaceRangeRequest;
pub use transactions::{retry_transaction, SqliteTransactionGuard, TransactionGuard};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::database::DatabaseUrl;
use crate::errors::{AppError, AppResult};

/// How long a writer waits on a locked `SQLite` file before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pool size for file-backed databases
const FILE_POOL_SIZE: u32 = 5;

/// Database manager for the materialization store
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if missing) the database and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    pub async fn new(url: &DatabaseUrl) -> AppResult<Self> {
        Self::with_max_connections(url, FILE_POOL_SIZE).await
    }

    /// Open with an explicit pool size
    ///
    /// In-memory databases always use one connection so every query sees the same store.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    pub async fn with_max_connections(url: &DatabaseUrl, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&url.to_connection_string())
            .map_err(|e| AppError::config(format!("Invalid database URL '{url}': {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let max_connections = if url.is_memory() { 1 } else { max_connections };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to {url}: {e}")))?;

        info!(database = %url, max_connections, "Database connected");
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if migration fails
    pub async fn from_pool(pool: SqlitePool) -> AppResult<Self> {
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_daily_facts().await?;
        self.migrate_parameter_versions().await?;
        self.migrate_outliers().await?;
        self.migrate_materialized_days().await?;
        self.migrate_runs().await?;
        self.migrate_weekly_snapshots().await?;
        debug!("Database migrations complete");
        Ok(())
    }

    async fn execute_ddl(&self, table: &str, statement: &str) -> AppResult<()> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to migrate {table}: {e}")))?;
        Ok(())
    }

    async fn migrate_daily_facts(&self) -> AppResult<()> {
        self.execute_ddl(
            "daily_facts",
            r"
            CREATE TABLE IF NOT EXISTS daily_facts (
                fact_date TEXT PRIMARY KEY,
                intake_kcal REAL,
                protein_g REAL,
                carbohydrate_g REAL,
                fat_g REAL,
                fiber_g REAL,
                exercise_kcal REAL,
                body_weight_kg REAL,
                fat_mass_kg REAL,
                fat_free_mass_kg REAL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    async fn migrate_parameter_versions(&self) -> AppResult<()> {
        self.execute_ddl(
            "parameter_versions",
            r"
            CREATE TABLE IF NOT EXISTS parameter_versions (
                version_id TEXT PRIMARY KEY,
                effective_start_date TEXT NOT NULL UNIQUE,
                effective_end_date TEXT,
                alpha_fat_mass REAL NOT NULL,
                alpha_lean_mass REAL NOT NULL,
                bmr_intercept_kcal REAL NOT NULL,
                bmr_slope_kcal_per_kg_lean REAL NOT NULL,
                exercise_compensation_fraction REAL NOT NULL,
                energy_density_kcal_per_kg_fat REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await
    }

    async fn migrate_outliers(&self) -> AppResult<()> {
        self.execute_ddl(
            "outlier_audit",
            r"
            CREATE TABLE IF NOT EXISTS outlier_audit (
                fact_date TEXT NOT NULL,
                metric TEXT NOT NULL CHECK (metric IN ('fat_mass', 'fat_free_mass')),
                original_value REAL NOT NULL,
                rule TEXT NOT NULL,
                reason TEXT NOT NULL,
                run_id TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (fact_date, metric)
            )
            ",
        )
        .await?;

        self.execute_ddl(
            "outlier_admissions",
            r"
            CREATE TABLE IF NOT EXISTS outlier_admissions (
                fact_date TEXT NOT NULL,
                metric TEXT NOT NULL CHECK (metric IN ('fat_mass', 'fat_free_mass')),
                reviewer TEXT NOT NULL,
                note TEXT,
                admitted_at TEXT NOT NULL,
                PRIMARY KEY (fact_date, metric)
            )
            ",
        )
        .await
    }

    async fn migrate_materialized_days(&self) -> AppResult<()> {
        self.execute_ddl(
            "materialized_days",
            r"
            CREATE TABLE IF NOT EXISTS materialized_days (
                fact_date TEXT PRIMARY KEY,
                fat_mass_kg REAL NOT NULL,
                lean_mass_kg REAL NOT NULL,
                fat_mass_variance REAL,
                bmr_kcal INTEGER NOT NULL,
                compensated_exercise_kcal INTEGER NOT NULL,
                net_energy_kcal INTEGER NOT NULL,
                parameter_version_id TEXT NOT NULL REFERENCES parameter_versions(version_id),
                computed_at TEXT NOT NULL,
                run_id TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute_ddl(
            "materialized_days",
            "CREATE INDEX IF NOT EXISTS idx_materialized_days_version ON materialized_days(parameter_version_id)",
        )
        .await
    }

    async fn migrate_runs(&self) -> AppResult<()> {
        self.execute_ddl(
            "materialization_runs",
            r"
            CREATE TABLE IF NOT EXISTS materialization_runs (
                run_id TEXT PRIMARY KEY,
                mode TEXT NOT NULL CHECK (mode IN ('extend_forward', 'rebuild')),
                requested_start TEXT,
                requested_end TEXT,
                start_date TEXT,
                end_date TEXT,
                state TEXT NOT NULL,
                rows_processed INTEGER NOT NULL DEFAULT 0,
                outliers_flagged INTEGER NOT NULL DEFAULT 0,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error_code TEXT,
                error_detail TEXT,
                engine_config TEXT NOT NULL
            )
            ",
        )
        .await?;

        self.execute_ddl(
            "materialization_runs",
            "CREATE INDEX IF NOT EXISTS idx_materialization_runs_started ON materialization_runs(started_at)",
        )
        .await
    }

    async fn migrate_weekly_snapshots(&self) -> AppResult<()> {
        self.execute_ddl(
            "weekly_snapshots",
            r"
            CREATE TABLE IF NOT EXISTS weekly_snapshots (
                week_start TEXT PRIMARY KEY,
                week_end TEXT NOT NULL,
                days INTEGER NOT NULL,
                fat_mass_start_kg REAL NOT NULL,
                fat_mass_end_kg REAL NOT NULL,
                fat_mass_change_kg REAL NOT NULL,
                lean_mass_start_kg REAL NOT NULL,
                lean_mass_end_kg REAL NOT NULL,
                mean_intake_kcal REAL,
                total_net_energy_kcal INTEGER NOT NULL,
                predicted_fat_change_kg REAL NOT NULL,
                implied_energy_density_kcal_per_kg REAL,
                parameter_version_ids TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .await
    }
}

/// Parse a UUID stored as TEXT
pub(crate) fn parse_uuid(raw: &str, column: &str) -> AppResult<uuid::Uuid> {
    uuid::Uuid::parse_str(raw)
        .map_err(|e| AppError::database(format!("Invalid UUID in {column}: {e}")))
}
