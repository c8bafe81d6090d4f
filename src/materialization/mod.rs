// ABOUTME: Materialization orchestration: range planning, range locks and the run driver
// ABOUTME: The only sanctioned write path for the derived daily series
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Materialization
//!
//! A run resolves its date range, takes a lock on it, loads every input once,
//! computes the whole range in memory and then strip-and-replaces the stored
//! rows in a single transaction.

/// Run driver
pub mod orchestrator;
/// Effective range resolution
pub mod planner;
/// In-process locks on date ranges
pub mod range_lock;

pub use orchestrator::Materializer;
pub use planner::{plan_range, validate_seed, MaterializeRequest, RangePlan, StoreBounds};
pub use range_lock::{RangeLockGuard, RangeLockRegistry};
