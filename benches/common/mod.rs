// ABOUTME: Common benchmark utilities and fixtures for performance testing
// ABOUTME: Provides deterministic daily facts and parameter timelines for Criterion benchmarks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

//! Common benchmark utilities and fixtures.

pub mod fixtures;
