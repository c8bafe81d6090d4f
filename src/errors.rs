// ABOUTME: Error types re-exported from healthseries-core for crate-local paths
// ABOUTME: AppError, ErrorCode, AppResult and MaterializationError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

pub use healthseries_core::errors::{AppError, AppResult, ErrorCode, MaterializationError};
pub use healthseries_engine::config::ConfigError;
