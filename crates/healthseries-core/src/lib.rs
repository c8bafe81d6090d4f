// ABOUTME: Core types and constants for the healthseries materialization engine
// ABOUTME: Foundation crate with error handling, domain models, and physiological constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

#![deny(unsafe_code)]

//! # healthseries Core
//!
//! Foundation crate providing shared types and constants for the daily series
//! materialization engine. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `MaterializationError`
//! - **constants**: Physiological bounds, estimator defaults and limits
//! - **models**: Daily facts, parameter versions, outlier audit, materialized days, runs, snapshots

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (`DailyFact`, `ParameterVersion`, `MaterializedDay`, etc.)
pub mod models;
