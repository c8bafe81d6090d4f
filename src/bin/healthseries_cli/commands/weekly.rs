// ABOUTME: Weekly snapshot commands for healthseries-cli
// ABOUTME: Snapshots one week, every completed week, or lists stored snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use healthseries::database::Database;
use healthseries::errors::AppResult;
use healthseries::weekly::WeeklySnapshotService;

use crate::helpers::display::display_snapshot;

/// Snapshot one week
pub async fn snapshot(database: Database, week_start: NaiveDate) -> AppResult<()> {
    let snapshot = WeeklySnapshotService::new(database)
        .snapshot_week(week_start)
        .await?;
    display_snapshot(&snapshot);
    Ok(())
}

/// Snapshot every completed week
pub async fn complete(database: Database) -> AppResult<()> {
    let created = WeeklySnapshotService::new(database)
        .snapshot_completed_weeks()
        .await?;
    if created.is_empty() {
        println!("No completed weeks waiting for a snapshot");
    }
    for snapshot in &created {
        display_snapshot(snapshot);
    }
    Ok(())
}

/// List stored snapshots
pub async fn list(database: &Database) -> AppResult<()> {
    let snapshots = database.list_weekly_snapshots().await?;
    if snapshots.is_empty() {
        println!("No weekly snapshots stored");
    }
    for snapshot in &snapshots {
        display_snapshot(snapshot);
    }
    Ok(())
}
