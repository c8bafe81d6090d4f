// ABOUTME: Unified error handling with standard error codes for the healthseries workspace
// ABOUTME: AppError carries a stable code, message and optional source for error chaining
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! # Unified Error Handling System
//!
//! Every fallible library operation returns [`AppResult`]. The [`ErrorCode`] is stable
//! and serializable so operators and scheduled jobs can branch on the remediation
//! that applies (add a parameter version, supply a seed, retry later).

/// Materialization-specific error variants
pub mod materialization;

pub use materialization::MaterializationError;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    /// Caller supplied invalid input
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A required field was missing
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    /// Value outside the acceptable range
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3003,

    // Resource Management (4000-4999)
    /// Requested resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    /// Resource with this identifier already exists
    #[serde(rename = "RESOURCE_ALREADY_EXISTS")]
    ResourceAlreadyExists = 4001,
    /// Resource is locked (referenced or owned by another run)
    #[serde(rename = "RESOURCE_LOCKED")]
    ResourceLocked = 4002,

    // Configuration (6000-6999)
    /// Generic configuration error
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Configuration failed validation
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Materialization (7000-7999)
    /// No parameter version covers a date in the requested range
    #[serde(rename = "PARAMETER_COVERAGE_MISSING")]
    ParameterCoverageMissing = 7000,
    /// A from-scratch rebuild cannot seed a metric at its first date
    #[serde(rename = "SEED_UNAVAILABLE")]
    SeedUnavailable = 7001,
    /// Another run already owns an overlapping date range
    #[serde(rename = "RANGE_LOCKED")]
    RangeLocked = 7002,
    /// Run state machine received an illegal transition
    #[serde(rename = "INVALID_RUN_TRANSITION")]
    InvalidRunTransition = 7003,
    /// Run stopped before reaching a terminal state and was closed by a later run
    #[serde(rename = "RUN_ABANDONED")]
    RunAbandoned = 7004,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Database operation failed
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    /// Serialization or deserialization failed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Process exit code used by the CLI for this error
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InvalidInput | Self::MissingRequiredField | Self::ValueOutOfRange => 2,
            Self::ResourceNotFound => 3,
            Self::ResourceAlreadyExists | Self::ResourceLocked | Self::RangeLocked => 4,
            Self::ConfigError | Self::ConfigInvalid => 5,
            Self::ParameterCoverageMissing => 10,
            Self::SeedUnavailable => 11,
            Self::InvalidRunTransition
            | Self::RunAbandoned
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError => 1,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ResourceAlreadyExists => "A resource with this identifier already exists",
            Self::ResourceLocked => "The resource is locked and cannot be modified",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::ParameterCoverageMissing => {
                "No parameter version is effective for a date in the requested range"
            }
            Self::SeedUnavailable => "The smoother cannot be seeded for the requested range",
            Self::RangeLocked => "Another materialization run owns an overlapping date range",
            Self::InvalidRunTransition => "Illegal materialization run state transition",
            Self::RunAbandoned => "Materialization run stopped before completing",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Stable string form used in persisted run records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceAlreadyExists => "RESOURCE_ALREADY_EXISTS",
            Self::ResourceLocked => "RESOURCE_LOCKED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::ParameterCoverageMissing => "PARAMETER_COVERAGE_MISSING",
            Self::SeedUnavailable => "SEED_UNAVAILABLE",
            Self::RangeLocked => "RANGE_LOCKED",
            Self::InvalidRunTransition => "INVALID_RUN_TRANSITION",
            Self::RunAbandoned => "RUN_ABANDONED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SerializationError => "SERIALIZATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Value out of range
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValueOutOfRange, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Resource already exists
    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceAlreadyExists,
            format!("{} already exists", resource.into()),
        )
    }

    /// Conflicting write against an immutable record
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceAlreadyExists, message)
    }

    /// Resource locked
    pub fn locked(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceLocked, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string()).with_source(error)
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error.to_string()).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_exit_codes_are_distinct_for_remediation() {
        assert_eq!(ErrorCode::ParameterCoverageMissing.exit_code(), 10);
        assert_eq!(ErrorCode::SeedUnavailable.exit_code(), 11);
        assert_ne!(
            ErrorCode::ParameterCoverageMissing.exit_code(),
            ErrorCode::SeedUnavailable.exit_code()
        );
        assert_eq!(ErrorCode::DatabaseError.exit_code(), 1);
    }

    #[test]
    fn test_error_code_serializes_to_stable_name() {
        let json = serde_json::to_string(&ErrorCode::RangeLocked).unwrap_or_default();
        assert_eq!(json, "\"RANGE_LOCKED\"");
        assert_eq!(ErrorCode::RangeLocked.as_str(), "RANGE_LOCKED");
    }

    #[test]
    fn test_app_error_display_includes_description_and_message() {
        let error = AppError::not_found("Parameter version v9");
        assert_eq!(error.code, ErrorCode::ResourceNotFound);
        assert_eq!(
            error.to_string(),
            "The requested resource was not found: Parameter version v9 not found"
        );
    }
}
