// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory database, parameter versions and deterministic daily facts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::expect_used,
    clippy::type_complexity
)]
//! Shared test utilities for `healthseries`

use std::sync::Once;

use chrono::{Duration, NaiveDate};
use healthseries::config::DatabaseUrl;
use healthseries::database::Database;
use healthseries::engine::EngineConfig;
use healthseries::materialization::Materializer;
use healthseries::models::{DailyFact, DateRange, MaterializedDay, ParameterVersion};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fresh in-memory database with migrations applied
pub async fn create_test_database() -> Database {
    init_test_logging();
    Database::new(&DatabaseUrl::Memory)
        .await
        .expect("Failed to create test database")
}

/// Orchestrator over `database` with default engine settings
pub fn materializer(database: &Database) -> Materializer {
    Materializer::new(database.clone(), EngineConfig::default())
}

/// `2024-01-01 + offset`; day 0 is a Monday
pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date") + Duration::days(offset)
}

pub fn range(start: i64, end: i64) -> DateRange {
    DateRange::new(day(start), day(end)).expect("valid range")
}

pub fn version(id: &str, start: i64, end: Option<i64>) -> ParameterVersion {
    ParameterVersion {
        version_id: id.to_owned(),
        effective_start_date: day(start),
        effective_end_date: end.map(day),
        alpha_fat_mass: 0.25,
        alpha_lean_mass: 0.1,
        bmr_intercept_kcal: 370.0,
        bmr_slope_kcal_per_kg_lean: 21.6,
        exercise_compensation_fraction: 0.2,
        energy_density_kcal_per_kg_fat: 7700.0,
    }
}

/// Plausible measurements with a small repeating wobble
pub fn steady_fact(offset: i64) -> DailyFact {
    let wobble = offset.rem_euclid(5) as f64;
    DailyFact {
        intake_kcal: Some(2100.0 + 25.0 * wobble),
        protein_g: Some(140.0),
        exercise_kcal: Some(300.0),
        body_weight_kg: Some(75.0),
        fat_mass_kg: Some(19.8 + 0.1 * wobble),
        fat_free_mass_kg: Some(55.0 + 0.1 * offset.rem_euclid(3) as f64),
        ..DailyFact::empty(day(offset))
    }
}

pub fn steady_facts(start: i64, end: i64) -> Vec<DailyFact> {
    (start..=end).map(steady_fact).collect()
}

/// Database holding facts for days `0..=last` and one open version from day 0
pub async fn seeded_database(last: i64) -> Database {
    let database = create_test_database().await;
    database
        .create_parameter_version(&version("v1", 0, None))
        .await
        .expect("Failed to create parameter version");
    database
        .upsert_daily_facts(&steady_facts(0, last))
        .await
        .expect("Failed to insert facts");
    database
}

/// Stored rows for `[start, end]`
pub async fn stored_days(database: &Database, start: i64, end: i64) -> Vec<MaterializedDay> {
    database
        .get_materialized_days(day(start), day(end))
        .await
        .expect("Failed to read materialized days")
}

/// Value-bearing columns of a row, ignoring run id and timestamp
pub fn values(row: &MaterializedDay) -> (NaiveDate, f64, f64, Option<f64>, i64, i64, i64, String) {
    (
        row.date,
        row.fat_mass_kg,
        row.lean_mass_kg,
        row.fat_mass_variance,
        row.bmr_kcal,
        row.compensated_exercise_kcal,
        row.net_energy_kcal,
        row.parameter_version_id.clone(),
    )
}
