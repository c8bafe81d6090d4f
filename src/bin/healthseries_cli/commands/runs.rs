// ABOUTME: Run log commands for healthseries-cli
// ABOUTME: Lists recent runs and shows one run with its error detail and engine config
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use healthseries::database::Database;
use healthseries::errors::{AppError, AppResult};
use uuid::Uuid;

use crate::helpers::display::{display_run, display_runs};

/// Most recent runs
pub async fn list(database: &Database, limit: u32) -> AppResult<()> {
    display_runs(&database.list_runs(limit).await?);
    Ok(())
}

/// One run in detail
pub async fn show(database: &Database, run_id: Uuid) -> AppResult<()> {
    let run = database
        .get_run(run_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Materialization run {run_id}")))?;
    display_run(&run);
    Ok(())
}
