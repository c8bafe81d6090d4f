// ABOUTME: Re-exports command modules for healthseries-cli
// ABOUTME: One module per subcommand group
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

pub mod audit;
pub mod facts;
pub mod materialize;
pub mod params;
pub mod runs;
pub mod weekly;
