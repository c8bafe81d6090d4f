// ABOUTME: Tests for environment-driven configuration and file-backed databases
// ABOUTME: Validates overrides, rejection of bad values and persistence across reopen
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use healthseries::config::environment::AppConfig;
use healthseries::config::{DatabaseConfig, DatabaseUrl};
use healthseries::database::Database;
use healthseries::engine::{EngineConfig, FatMassEstimator};
use healthseries::errors::ErrorCode;
use healthseries::logging::{LogFormat, LoggingConfig};
use healthseries::materialization::MaterializeRequest;
use serial_test::serial;

mod common;
use common::*;

const ENGINE_VARS: [&str; 4] = [
    "SERIES_LOOKBACK_DAYS",
    "SERIES_FAT_MASS_ESTIMATOR",
    "SERIES_OUTLIER_Z_CUTOFF",
    "SERIES_KALMAN_INITIAL_VARIANCE",
];

fn clear_env() {
    for var in ENGINE_VARS {
        env::remove_var(var);
    }
    env::remove_var("DATABASE_URL");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
    env::remove_var("LOG_FORMAT");
}

#[test]
fn test_database_url_parsing() {
    assert!(DatabaseUrl::parse_url("sqlite::memory:").unwrap().is_memory());
    assert_eq!(
        DatabaseUrl::parse_url("sqlite:./data/series.db").unwrap(),
        DatabaseUrl::SQLite {
            path: "./data/series.db".into()
        }
    );
    assert_eq!(
        DatabaseUrl::parse_url("/var/lib/series.db").unwrap(),
        DatabaseUrl::SQLite {
            path: "/var/lib/series.db".into()
        }
    );
    assert_eq!(
        DatabaseUrl::parse_url("postgres://localhost/db")
            .unwrap_err()
            .code,
        ErrorCode::InvalidInput
    );
    assert!(DatabaseUrl::parse_url("  ").is_err());
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.engine, EngineConfig::default());
    assert_eq!(config.database, DatabaseConfig::default());
}

#[test]
#[serial]
fn test_engine_overrides_from_environment() {
    clear_env();
    env::set_var("SERIES_LOOKBACK_DAYS", "180");
    env::set_var("SERIES_FAT_MASS_ESTIMATOR", "kalman");
    env::set_var("SERIES_OUTLIER_Z_CUTOFF", "4.0");

    let config = EngineConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.lookback_days, 180);
    assert_eq!(config.smoothing.fat_mass_estimator, FatMassEstimator::Kalman);
    assert!((config.outliers.z_score_cutoff - 4.0).abs() < f64::EPSILON);
}

#[test]
#[serial]
fn test_invalid_environment_values_are_rejected() {
    clear_env();
    env::set_var("SERIES_FAT_MASS_ESTIMATOR", "median");
    assert!(EngineConfig::from_env().is_err());

    clear_env();
    env::set_var("SERIES_LOOKBACK_DAYS", "10");
    let err = AppConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    clear_env();
    env::set_var("DATABASE_MAX_CONNECTIONS", "0");
    assert_eq!(
        DatabaseConfig::from_env().unwrap_err().code,
        ErrorCode::ConfigError
    );
    clear_env();
}

#[test]
#[serial]
fn test_database_settings_from_environment() {
    clear_env();
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("DATABASE_MAX_CONNECTIONS", "2");

    let config = DatabaseConfig::from_env().unwrap();
    clear_env();

    assert!(config.url.is_memory());
    assert_eq!(config.max_connections, 2);
}

#[test]
#[serial]
fn test_logging_format_from_environment() {
    clear_env();
    env::set_var("LOG_FORMAT", "json");
    let config = LoggingConfig::from_env().with_level("debug");
    clear_env();

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "debug");
    assert_eq!(config.service_name, "healthseries");
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = DatabaseUrl::SQLite {
        path: dir.path().join("series.db"),
    };

    {
        let db = Database::new(&url).await.unwrap();
        db.create_parameter_version(&version("v1", 0, None))
            .await
            .unwrap();
        db.upsert_daily_facts(&steady_facts(0, 6)).await.unwrap();
        materializer(&db)
            .materialize(MaterializeRequest::rebuild(day(0), day(6)))
            .await
            .unwrap();
        db.pool().close().await;
    }

    let reopened = Database::new(&url).await.unwrap();
    assert_eq!(stored_days(&reopened, 0, 6).await.len(), 7);
    assert_eq!(reopened.latest_materialized_date().await.unwrap(), Some(day(6)));
}
