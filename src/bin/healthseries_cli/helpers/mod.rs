// ABOUTME: Helper modules for healthseries-cli
// ABOUTME: Terminal output formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

pub mod display;
