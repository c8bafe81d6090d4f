// ABOUTME: Outlier audit commands for healthseries-cli
// ABOUTME: Lists excluded readings and reverses an exclusion on reviewer request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use chrono::NaiveDate;
use healthseries::database::Database;
use healthseries::errors::AppResult;
use healthseries::models::{BodyMetric, DateRange};

use crate::helpers::display::{display_admission, display_audit};

/// List audit entries, optionally within `[start, end]`
pub async fn list(
    database: &Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> AppResult<()> {
    let range = match (start, end) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)?),
        _ => None,
    };
    display_audit(&database.list_outlier_audit(range).await?);
    Ok(())
}

/// Reverse one exclusion
pub async fn reverse(
    database: &Database,
    date: NaiveDate,
    metric: BodyMetric,
    reviewer: &str,
    note: Option<&str>,
) -> AppResult<()> {
    let admission = database
        .reverse_exclusion(date, metric, reviewer, note)
        .await?;
    display_admission(&admission);
    Ok(())
}
