// ABOUTME: Materialize command for healthseries-cli
// ABOUTME: Builds the rebuild trigger from flags and prints the run outcome
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use healthseries::database::Database;
use healthseries::engine::EngineConfig;
use healthseries::errors::AppResult;
use healthseries::materialization::{MaterializeRequest, Materializer};
use healthseries::models::SeedState;
use tracing::info;

use crate::helpers::display::display_outcome;

/// Flags of the `materialize` subcommand
pub struct MaterializeArgs {
    /// First date to rebuild
    pub start: Option<NaiveDate>,
    /// Last date to rebuild
    pub end: Option<NaiveDate>,
    /// Rebuild without an explicit range
    pub rebuild: bool,
    /// Seed fat mass
    pub seed_fat: Option<f64>,
    /// Seed fat-free mass
    pub seed_lean: Option<f64>,
}

/// Run one materialization
pub async fn run(database: Database, config: EngineConfig, args: MaterializeArgs) -> AppResult<()> {
    let mut request = MaterializeRequest {
        start: args.start,
        end: args.end,
        rebuild: args.rebuild,
        seed: None,
    };
    if let (Some(fat), Some(lean)) = (args.seed_fat, args.seed_lean) {
        request = request.with_seed(SeedState::new(fat, lean));
    }

    info!(mode = request.mode().as_str(), "Starting materialization");
    let outcome = Materializer::new(database, config).materialize(request).await?;
    display_outcome(&outcome);
    Ok(())
}
