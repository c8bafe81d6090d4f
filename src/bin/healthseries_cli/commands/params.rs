// ABOUTME: Parameter version commands for healthseries-cli
// ABOUTME: List, add, supersede and delete effective-dated coefficient sets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use healthseries::database::Database;
use healthseries::errors::AppResult;
use healthseries::models::ParameterVersion;

use crate::helpers::display::display_versions;

/// List every version
pub async fn list(database: &Database) -> AppResult<()> {
    display_versions(&database.list_parameter_versions().await?);
    Ok(())
}

/// Add a version
pub async fn add(database: &Database, version: ParameterVersion) -> AppResult<()> {
    database.create_parameter_version(&version).await?;
    println!(
        "Parameter version {} effective from {}",
        version.version_id, version.effective_start_date
    );
    Ok(())
}

/// Close `prior` and add `next`
pub async fn supersede(database: &Database, prior: &str, next: ParameterVersion) -> AppResult<()> {
    database.supersede_parameter_version(prior, &next).await?;
    println!(
        "Parameter version {prior} superseded by {} from {}",
        next.version_id, next.effective_start_date
    );
    Ok(())
}

/// Delete an unreferenced version
pub async fn delete(database: &Database, version_id: &str) -> AppResult<()> {
    database.delete_parameter_version(version_id).await?;
    println!("Parameter version {version_id} deleted");
    Ok(())
}
