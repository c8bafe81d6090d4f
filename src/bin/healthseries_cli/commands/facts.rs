// ABOUTME: Daily fact import command for healthseries-cli
// ABOUTME: Reads a JSON array of facts and upserts them in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use std::path::Path;

use anyhow::Context;
use healthseries::database::Database;
use healthseries::models::DailyFact;
use tracing::info;

/// Import facts from `path`
pub async fn import(database: &Database, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let facts: Vec<DailyFact> =
        serde_json::from_str(&raw).context("expected a JSON array of daily facts")?;

    let count = database.upsert_daily_facts(&facts).await?;
    info!(count, "Daily facts imported");
    println!("Imported {count} daily facts from {}", path.display());
    Ok(())
}
