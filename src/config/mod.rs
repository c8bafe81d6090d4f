// ABOUTME: Configuration management for the healthseries service
// ABOUTME: Database location and engine thresholds, loaded from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Configuration module
//!
//! Configuration comes from environment variables only:
//! - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`
//! - `SERIES_*` engine overrides (see [`healthseries_engine::config`])
//! - `RUST_LOG`, `LOG_FORMAT`, `LOG_INCLUDE_LOCATION`, `ENVIRONMENT` for logging

/// Database connection configuration
pub mod database;
/// Top-level application configuration
pub mod environment;

pub use database::{DatabaseConfig, DatabaseUrl};
pub use environment::AppConfig;
