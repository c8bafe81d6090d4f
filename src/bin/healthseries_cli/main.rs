// ABOUTME: healthseries CLI - operator tool for materialization, parameters, audit and snapshots
// ABOUTME: Maps domain error codes to process exit codes so scripts can branch on remediation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 healthseries contributors
//!
//! Usage:
//! ```bash
//! # Extend the series up to the latest fact
//! healthseries-cli materialize
//!
//! # Rebuild a range from an explicit seed
//! healthseries-cli materialize --start 2024-03-01 --end 2024-03-31 --seed-fat 21.4 --seed-lean 58.2
//!
//! # Close v1 and start v2 on the first of April
//! healthseries-cli params supersede --prior v1 --id v2 --start 2024-04-01 --alpha-fat 0.2 ...
//!
//! # Re-admit an excluded reading
//! healthseries-cli audit reverse --date 2024-03-14 --metric fat_mass --reviewer coach
//!
//! # Snapshot every completed week
//! healthseries-cli weekly complete
//! ```
//!
//! Exit codes: 2 invalid input, 3 not found, 4 conflict or locked range,
//! 5 configuration, 10 missing parameter version, 11 unseedable metric.

mod commands;
mod helpers;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use healthseries::config::environment::AppConfig;
use healthseries::config::DatabaseUrl;
use healthseries::database::Database;
use healthseries::errors::AppError;
use healthseries::logging::LoggingConfig;
use healthseries::models::BodyMetric;
use tracing::debug;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "healthseries-cli",
    about = "Daily series materialization CLI",
    long_about = "Materialize smoothed body-composition and energy-balance series, manage parameter versions, review outliers and create weekly snapshots."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override (defaults to `DATABASE_URL`)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Extend or rebuild the materialized series
    Materialize {
        /// First date to rebuild
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date to rebuild
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Rebuild the whole history when no range is given
        #[arg(long)]
        rebuild: bool,

        /// Seed fat mass (kg) for the day before `start`
        #[arg(long, requires = "seed_lean")]
        seed_fat: Option<f64>,

        /// Seed fat-free mass (kg) for the day before `start`
        #[arg(long, requires = "seed_fat")]
        seed_lean: Option<f64>,
    },

    /// Parameter version management
    Params {
        #[command(subcommand)]
        action: ParamsCommand,
    },

    /// Outlier audit review
    Audit {
        #[command(subcommand)]
        action: AuditCommand,
    },

    /// Materialization run log
    Runs {
        #[command(subcommand)]
        action: RunsCommand,
    },

    /// Weekly snapshots
    Weekly {
        #[command(subcommand)]
        action: WeeklyCommand,
    },

    /// Raw daily facts
    Facts {
        #[command(subcommand)]
        action: FactsCommand,
    },
}

/// Coefficients of a parameter version
#[derive(Args)]
struct VersionArgs {
    /// Version id
    #[arg(long)]
    id: String,

    /// First effective date
    #[arg(long)]
    start: NaiveDate,

    /// Last effective date (open-ended if omitted)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// EMA alpha for fat mass, in (0, 1]
    #[arg(long)]
    alpha_fat: f64,

    /// EMA alpha for fat-free mass, in (0, 1]
    #[arg(long)]
    alpha_lean: f64,

    /// BMR intercept (kcal)
    #[arg(long)]
    bmr_intercept: f64,

    /// BMR slope (kcal per kg fat-free mass)
    #[arg(long)]
    bmr_slope: f64,

    /// Exercise compensation fraction, in [0, 1)
    #[arg(long)]
    compensation: f64,

    /// Energy density of fat (kcal per kg)
    #[arg(long, default_value = "7700")]
    energy_density: f64,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum ParamsCommand {
    /// List every parameter version
    List,

    /// Add a parameter version
    Add(VersionArgs),

    /// Close a version the day before a new one starts
    Supersede {
        /// Version to close
        #[arg(long)]
        prior: String,

        #[command(flatten)]
        next: VersionArgs,
    },

    /// Delete a version no materialized row references
    Delete {
        /// Version id
        version_id: String,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum AuditCommand {
    /// List excluded readings
    List {
        /// First date
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Last date
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },

    /// Re-admit an excluded reading on the next rebuild
    Reverse {
        /// Date of the reading
        #[arg(long)]
        date: NaiveDate,

        /// `fat_mass` or `fat_free_mass`
        #[arg(long)]
        metric: BodyMetric,

        /// Who reviewed the reading
        #[arg(long)]
        reviewer: String,

        /// Review note
        #[arg(long)]
        note: Option<String>,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum RunsCommand {
    /// Most recent runs
    List {
        /// Number of runs to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show one run
    Show {
        /// Run id
        run_id: Uuid,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum WeeklyCommand {
    /// Snapshot one week
    Snapshot {
        /// Monday that opens the week
        #[arg(long)]
        week_start: NaiveDate,
    },

    /// Snapshot every completed week without a snapshot
    Complete,

    /// List stored snapshots
    List,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum FactsCommand {
    /// Upsert daily facts from a JSON array
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<AppError>()
                .map_or(1, |app_error| app_error.code.exit_code());
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let logging = LoggingConfig::from_env();
    let logging = if cli.verbose {
        logging.with_level("debug")
    } else {
        logging
    };
    logging.init()?;

    let mut config = AppConfig::from_env()?;
    if let Some(url) = cli.database_url.as_deref() {
        config.database.url = DatabaseUrl::parse_url(url)?;
    }
    debug!(database = %config.database.url, "Opening database");
    let database =
        Database::with_max_connections(&config.database.url, config.database.max_connections)
            .await?;

    match cli.command {
        Command::Materialize {
            start,
            end,
            rebuild,
            seed_fat,
            seed_lean,
        } => {
            commands::materialize::run(
                database,
                config.engine,
                commands::materialize::MaterializeArgs {
                    start,
                    end,
                    rebuild,
                    seed_fat,
                    seed_lean,
                },
            )
            .await?;
        }
        Command::Params { action } => match action {
            ParamsCommand::List => commands::params::list(&database).await?,
            ParamsCommand::Add(args) => commands::params::add(&database, args.into()).await?,
            ParamsCommand::Supersede { prior, next } => {
                commands::params::supersede(&database, &prior, next.into()).await?;
            }
            ParamsCommand::Delete { version_id } => {
                commands::params::delete(&database, &version_id).await?;
            }
        },
        Command::Audit { action } => match action {
            AuditCommand::List { start, end } => {
                commands::audit::list(&database, start, end).await?;
            }
            AuditCommand::Reverse {
                date,
                metric,
                reviewer,
                note,
            } => {
                commands::audit::reverse(&database, date, metric, &reviewer, note.as_deref())
                    .await?;
            }
        },
        Command::Runs { action } => match action {
            RunsCommand::List { limit } => commands::runs::list(&database, limit).await?,
            RunsCommand::Show { run_id } => commands::runs::show(&database, run_id).await?,
        },
        Command::Weekly { action } => match action {
            WeeklyCommand::Snapshot { week_start } => {
                commands::weekly::snapshot(database, week_start).await?;
            }
            WeeklyCommand::Complete => commands::weekly::complete(database).await?,
            WeeklyCommand::List => commands::weekly::list(&database).await?,
        },
        Command::Facts { action } => match action {
            FactsCommand::Import { file } => {
                commands::facts::import(&database, &file)
                    .await
                    .with_context(|| format!("importing {}", file.display()))?;
            }
        },
    }

    Ok(())
}

impl From<VersionArgs> for healthseries::models::ParameterVersion {
    fn from(args: VersionArgs) -> Self {
        Self {
            version_id: args.id,
            effective_start_date: args.start,
            effective_end_date: args.end,
            alpha_fat_mass: args.alpha_fat,
            alpha_lean_mass: args.alpha_lean,
            bmr_intercept_kcal: args.bmr_intercept,
            bmr_slope_kcal_per_kg_lean: args.bmr_slope,
            exercise_compensation_fraction: args.compensation,
            energy_density_kcal_per_kg_fat: args.energy_density,
        }
    }
}
