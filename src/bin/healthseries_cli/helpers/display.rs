// ABOUTME: Output formatting helpers for healthseries-cli
// ABOUTME: Consistent tables for runs, parameter versions, audit entries and snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors

use healthseries::models::{
    MaterializationOutcome, MaterializationRun, OutlierAdmission, OutlierAudit, ParameterVersion,
    WeeklySnapshot,
};

fn rule() {
    println!("{}", "=".repeat(50));
}

/// Summary of a finished run
pub fn display_outcome(outcome: &MaterializationOutcome) {
    println!("\nMaterialization completed");
    rule();
    println!("   Run ID: {}", outcome.run_id);
    match (outcome.start_date, outcome.end_date) {
        (Some(start), Some(end)) => println!("   Range: {start} .. {end}"),
        _ => println!("   Range: already up to date"),
    }
    println!("   Rows written: {}", outcome.rows_processed);
    println!("   Outliers flagged: {}", outcome.outliers_flagged);
}

/// Parameter version table
pub fn display_versions(versions: &[ParameterVersion]) {
    if versions.is_empty() {
        println!("No parameter versions defined");
        return;
    }
    println!(
        "{:<12} {:<10} {:<10} {:>7} {:>7} {:>9} {:>7} {:>6} {:>8}",
        "VERSION", "START", "END", "A_FAT", "A_LEAN", "BMR_INT", "SLOPE", "COMP", "DENSITY"
    );
    for v in versions {
        println!(
            "{:<12} {:<10} {:<10} {:>7.3} {:>7.3} {:>9.1} {:>7.2} {:>6.2} {:>8.0}",
            v.version_id,
            v.effective_start_date,
            v.effective_end_date
                .map_or_else(|| "open".to_owned(), |d| d.to_string()),
            v.alpha_fat_mass,
            v.alpha_lean_mass,
            v.bmr_intercept_kcal,
            v.bmr_slope_kcal_per_kg_lean,
            v.exercise_compensation_fraction,
            v.energy_density_kcal_per_kg_fat,
        );
    }
}

/// Outlier audit table
pub fn display_audit(entries: &[OutlierAudit]) {
    if entries.is_empty() {
        println!("No excluded readings");
        return;
    }
    println!(
        "{:<10} {:<14} {:>8} {:<20} REASON",
        "DATE", "METRIC", "VALUE", "RULE"
    );
    for entry in entries {
        println!(
            "{:<10} {:<14} {:>8.2} {:<20} {}",
            entry.date, entry.metric, entry.original_value, entry.rule, entry.reason
        );
    }
}

/// Confirmation for a reversed exclusion
pub fn display_admission(admission: &OutlierAdmission) {
    println!("\nReading re-admitted");
    rule();
    println!("   Date: {}", admission.date);
    println!("   Metric: {}", admission.metric);
    println!("   Reviewer: {}", admission.reviewer);
    if let Some(note) = &admission.note {
        println!("   Note: {note}");
    }
    println!("\nRebuild a range covering {} to apply it.", admission.date);
}

/// One-line-per-run table
pub fn display_runs(runs: &[MaterializationRun]) {
    if runs.is_empty() {
        println!("No runs recorded");
        return;
    }
    println!(
        "{:<36} {:<14} {:<10} {:<10} {:<10} {:>6} {:>5}",
        "RUN", "MODE", "STATE", "START", "END", "ROWS", "OUTL"
    );
    for run in runs {
        println!(
            "{:<36} {:<14} {:<10} {:<10} {:<10} {:>6} {:>5}",
            run.run_id,
            run.mode.as_str(),
            run.state,
            run.start_date.map_or_else(|| "-".to_owned(), |d| d.to_string()),
            run.end_date.map_or_else(|| "-".to_owned(), |d| d.to_string()),
            run.rows_processed,
            run.outliers_flagged,
        );
    }
}

/// Full detail of one run
pub fn display_run(run: &MaterializationRun) {
    println!("\nRun {}", run.run_id);
    rule();
    println!("   Mode: {}", run.mode.as_str());
    println!("   State: {}", run.state);
    if let (Some(start), Some(end)) = (run.start_date, run.end_date) {
        println!("   Range: {start} .. {end}");
    }
    println!("   Started: {}", run.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(completed) = run.completed_at {
        println!("   Completed: {}", completed.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("   Rows: {}", run.rows_processed);
    println!("   Outliers flagged: {}", run.outliers_flagged);
    if let Some(code) = &run.error_code {
        println!("   Error: {code}");
    }
    if let Some(detail) = &run.error_detail {
        println!("   Detail: {detail}");
    }
    println!(
        "   Engine config: {}",
        serde_json::to_string_pretty(&run.engine_config).unwrap_or_default()
    );
}

/// Weekly snapshot card
pub fn display_snapshot(snapshot: &WeeklySnapshot) {
    println!("\nWeek {} .. {}", snapshot.week_start, snapshot.week_end);
    rule();
    println!(
        "   Fat mass: {:.2} -> {:.2} kg ({:+.2})",
        snapshot.fat_mass_start_kg, snapshot.fat_mass_end_kg, snapshot.fat_mass_change_kg
    );
    println!(
        "   Lean mass: {:.2} -> {:.2} kg",
        snapshot.lean_mass_start_kg, snapshot.lean_mass_end_kg
    );
    match snapshot.mean_intake_kcal {
        Some(mean) => println!("   Mean intake: {mean:.0} kcal"),
        None => println!("   Mean intake: no intake recorded"),
    }
    println!("   Net energy: {} kcal", snapshot.total_net_energy_kcal);
    println!(
        "   Predicted fat change: {:+.2} kg",
        snapshot.predicted_fat_change_kg
    );
    if let Some(density) = snapshot.implied_energy_density_kcal_per_kg {
        println!("   Implied energy density: {density:.0} kcal/kg");
    }
    println!(
        "   Parameter versions: {}",
        snapshot.parameter_version_ids.join(", ")
    );
}
