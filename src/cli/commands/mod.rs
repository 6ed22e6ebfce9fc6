//! Command implementations for the cohort linker CLI
//!
//! Each subcommand reads its input, runs one linking component and writes
//! the result. Components never write output themselves.

pub mod census;
pub mod geocode;
pub mod pollution;
pub mod shared;

use crate::cli::args::{Args, Commands};
use crate::error::{LinkerError, Result};
use crate::models::ProcessingStats;

/// Dispatch to the selected subcommand
pub async fn run(args: Args) -> Result<ProcessingStats> {
    shared::setup_logging(&args.logging())?;

    match args.command {
        Some(Commands::Geocode(geocode_args)) => geocode::run_geocode(geocode_args).await,
        Some(Commands::Census(census_args)) => census::run_census(census_args).await,
        Some(Commands::Pollution(pollution_args)) => {
            pollution::run_pollution(pollution_args).await
        }
        None => Err(LinkerError::configuration("No command given")),
    }
}
