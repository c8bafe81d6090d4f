// ABOUTME: Main library entry point for the healthseries materialization service
// ABOUTME: Configuration, logging, SQLite persistence, run orchestration and weekly snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

#![deny(unsafe_code)]

//! # healthseries
//!
//! Turns noisy daily health facts into a deterministic, reproducible derived series:
//! smoothed fat and lean mass, basal metabolic rate and net energy balance, with
//! outlier rejection, gap handling and immutable weekly snapshots.
//!
//! ## Architecture
//!
//! - **`healthseries-core`**: error types, constants and domain models
//! - **`healthseries-engine`**: the pure, sequential computation
//! - **this crate**: every side effect (configuration, logging, storage, orchestration)
//!
//! ## Example
//!
//! ```rust,no_run
//! use healthseries::config::environment::AppConfig;
//! use healthseries::database::Database;
//! use healthseries::materialization::{MaterializeRequest, Materializer};
//!
//! # async fn run() -> healthseries::errors::AppResult<()> {
//! let config = AppConfig::from_env()?;
//! let database = Database::new(&config.database.url).await?;
//! let materializer = Materializer::new(database, config.engine);
//! let outcome = materializer.materialize(MaterializeRequest::extend_forward()).await?;
//! println!("{} rows in run {}", outcome.rows_processed, outcome.run_id);
//! # Ok(())
//! # }
//! ```

/// Environment-driven configuration
pub mod config;

/// `SQLite` persistence for facts, parameters, audit, output and runs
pub mod database;

/// Unified error handling
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Range resolution, locking and the strip-and-replace run orchestrator
pub mod materialization;

/// Weekly snapshot service
pub mod weekly;

pub use healthseries_core::{constants, models};
pub use healthseries_engine as engine;
