//! Command-line argument definitions for the cohort linker
//!
//! This module defines the CLI interface using the clap derive API. Each
//! subcommand is one linking run: geocoding, census queries or pollution.

use crate::config::{LinkerConfig, MatchPolicy};
use crate::constants::{
    DEFAULT_CENSUS_PREFIX, DEFAULT_GEOCODE_WORKERS, DEFAULT_POLLUTANTS, GRID_TOLERANCE_METRES,
    MAX_GEOCODE_WORKERS, MERGED_CENSUS_SUFFIX, NOMIS_API_KEY_ENV,
};
use crate::error::{LinkerError, Result};
use crate::models::Pollutant;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Link UK cohort participants to census and pollution data
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cohort-linker",
    version,
    about = "Link geocoded UK cohort participants to Nomisweb census tables and DEFRA pollution grids",
    long_about = "Geocodes participant postcodes with postcodes.io, builds Nomisweb census \
                  queries from the published dataset metadata and attaches modelled annual \
                  pollution values from the DEFRA PCM grid by nearest 1km cell."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Geocode participant postcodes to British National Grid coordinates
    Geocode(GeocodeArgs),
    /// Build Nomisweb census query URLs and optionally download them
    Census(CensusArgs),
    /// Attach annual pollutant values to geocoded participants
    Pollution(PollutionArgs),
}

/// Verbosity flags shared by every subcommand
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LoggingArgs {
    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors. Overrides verbose settings.
    #[arg(short = 'q', long = "quiet", help = "Suppress progress and logging output")]
    pub quiet: bool,
}

impl LoggingArgs {
    /// Get the log level based on verbose and quiet flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Arguments for the geocode command
#[derive(Debug, Clone, Parser)]
pub struct GeocodeArgs {
    /// CSV with a participant id column and one postcode column per year
    ///
    /// Postcode column names must include the collection year, e.g.
    /// `Postcodes2008`.
    #[arg(short = 'f', long = "inputfile", value_name = "FILE")]
    pub input: PathBuf,

    /// Column name for participant ids
    #[arg(short = 'i', long = "idcol", value_name = "COLUMN")]
    pub id_column: String,

    /// Output CSV file
    #[arg(short = 'o', long = "outputfile", value_name = "FILE")]
    pub output: PathBuf,

    /// Number of concurrent postcodes.io lookups
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        default_value_t = DEFAULT_GEOCODE_WORKERS
    )]
    pub workers: usize,

    /// Alternative postcodes.io endpoint
    #[arg(long = "postcodes-url", value_name = "URL")]
    pub postcodes_url: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Arguments for the census command
#[derive(Debug, Clone, Parser)]
pub struct CensusArgs {
    /// Comma-separated dataset codes, matched against the start of dataset names
    #[arg(short = 'c', long = "codes", value_name = "LIST")]
    pub codes: DatasetCodes,

    /// Nomisweb access key
    #[arg(short = 'k', long = "key", env = NOMIS_API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Download each query result and decode its coded columns
    #[arg(long = "download")]
    pub download: bool,

    /// Directory for downloaded tables
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prefix of the merged table `<prefix>_nomisweb.csv` in the output directory
    #[arg(long = "prefix", value_name = "NAME", default_value = DEFAULT_CENSUS_PREFIX)]
    pub prefix: String,

    /// How to resolve a code matching several datasets (exact, first, reject-ambiguous)
    #[arg(long = "match-policy", value_name = "POLICY", default_value = "first")]
    pub match_policy: MatchPolicy,

    /// Alternative Nomisweb API root
    #[arg(long = "nomis-root", value_name = "URL")]
    pub nomis_root: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Arguments for the pollution command
#[derive(Debug, Clone, Parser)]
pub struct PollutionArgs {
    /// Geocoded participant CSV (output of the geocode command)
    #[arg(short = 'f', long = "geocodedata", value_name = "FILE")]
    pub input: PathBuf,

    /// Column name for participant ids
    #[arg(short = 'i', long = "idcol", value_name = "COLUMN")]
    pub id_column: String,

    /// Output prefix; results go to `<prefix>_pollution_data.csv`
    #[arg(short = 'o', long = "outputfile", value_name = "PREFIX")]
    pub output_prefix: PathBuf,

    /// Comma-separated pollutants
    #[arg(
        short = 'p',
        long = "pollutants",
        value_name = "LIST",
        default_value = DEFAULT_POLLUTANTS
    )]
    pub pollutants: PollutantList,

    /// Maximum distance in metres between a participant and its grid cell centre
    #[arg(long = "tolerance", value_name = "METRES", default_value_t = GRID_TOLERANCE_METRES)]
    pub tolerance: f64,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Wrapper for parsing comma-separated dataset codes
#[derive(Debug, Clone)]
pub struct DatasetCodes {
    pub codes: Vec<String>,
}

impl FromStr for DatasetCodes {
    type Err = LinkerError;

    fn from_str(s: &str) -> Result<Self> {
        let codes: Vec<String> = s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if codes.is_empty() {
            return Err(LinkerError::data_validation("Dataset code list cannot be empty"));
        }

        Ok(DatasetCodes { codes })
    }
}

/// Wrapper for parsing comma-separated pollutant lists
#[derive(Debug, Clone)]
pub struct PollutantList {
    pub pollutants: Vec<Pollutant>,
}

impl FromStr for PollutantList {
    type Err = LinkerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut pollutants: Vec<Pollutant> = Vec::new();
        for name in s.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let pollutant: Pollutant = name.parse()?;
            if !pollutants.contains(&pollutant) {
                pollutants.push(pollutant);
            }
        }

        if pollutants.is_empty() {
            return Err(LinkerError::data_validation("Pollutant list cannot be empty"));
        }

        Ok(PollutantList { pollutants })
    }
}

impl Args {
    /// Verbosity flags of the selected command
    pub fn logging(&self) -> LoggingArgs {
        match &self.command {
            Some(Commands::Geocode(args)) => args.logging.clone(),
            Some(Commands::Census(args)) => args.logging.clone(),
            Some(Commands::Pollution(args)) => args.logging.clone(),
            None => LoggingArgs::default(),
        }
    }
}

fn require_input(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(LinkerError::configuration(format!(
            "Input file does not exist: {}",
            path.display()
        )));
    }
    Ok(())
}

impl GeocodeArgs {
    /// Validate the geocode command arguments
    pub fn validate(&self) -> Result<()> {
        require_input(&self.input)?;

        if self.workers == 0 || self.workers > MAX_GEOCODE_WORKERS {
            return Err(LinkerError::configuration(format!(
                "Number of workers must be between 1 and {}",
                MAX_GEOCODE_WORKERS
            )));
        }

        Ok(())
    }

    /// Linker configuration with command overrides applied
    pub fn config(&self) -> LinkerConfig {
        let config = LinkerConfig::default().with_workers(self.workers);
        match &self.postcodes_url {
            Some(url) => config.with_postcodes_url(url.clone()),
            None => config,
        }
    }
}

impl CensusArgs {
    /// Validate the census command arguments
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(LinkerError::configuration(format!(
                "A Nomisweb access key is required: pass --key or set {}",
                NOMIS_API_KEY_ENV
            )));
        }

        if self.download && self.output_dir.is_none() {
            return Err(LinkerError::configuration(
                "--download requires --output-dir",
            ));
        }

        if self.prefix.trim().is_empty() {
            return Err(LinkerError::configuration("Census output prefix cannot be empty"));
        }

        Ok(())
    }

    /// Merged table path, when downloading
    pub fn merged_path(&self) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .filter(|_| self.download)
            .map(|dir| dir.join(format!("{}{}", self.prefix, MERGED_CENSUS_SUFFIX)))
    }

    pub fn config(&self) -> LinkerConfig {
        let config = LinkerConfig::default().with_match_policy(self.match_policy);
        match &self.nomis_root {
            Some(root) => config.with_nomis_root(root.clone()),
            None => config,
        }
    }
}

impl PollutionArgs {
    /// Validate the pollution command arguments
    pub fn validate(&self) -> Result<()> {
        require_input(&self.input)?;

        if self.id_column.trim().is_empty() {
            return Err(LinkerError::configuration("Participant id column cannot be empty"));
        }

        Ok(())
    }

    pub fn config(&self) -> LinkerConfig {
        LinkerConfig::default().with_grid_tolerance(self.tolerance)
    }

    /// Output file derived from the prefix
    pub fn output_path(&self) -> PathBuf {
        let mut name = self.output_prefix.as_os_str().to_owned();
        name.push("_pollution_data.csv");
        PathBuf::from(name)
    }
}
