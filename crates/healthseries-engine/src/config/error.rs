// ABOUTME: Configuration error types for engine configuration validation
// ABOUTME: Defines error variants for invalid ranges, parse failures, and out-of-range values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Configuration error types for engine configuration validation.

use std::env;
use thiserror::Error;

use healthseries_core::errors::{AppError, ErrorCode};

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bounds in the wrong order (e.g., minimum above maximum)
    #[error("Invalid range: {0}")]
    InvalidRange(&'static str),

    /// Required configuration field is missing
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Environment variable access or parse error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] env::VarError),

    /// Failed to parse configuration value
    #[error("Parse error: {0}")]
    Parse(String),

    /// Numeric value outside valid range for parameter
    #[error("Value out of range: {0}")]
    ValueOutOfRange(&'static str),
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        Self::new(ErrorCode::ConfigInvalid, error.to_string())
    }
}
