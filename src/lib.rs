//! Cohort Linker Library
//!
//! Tools for linking participants of a UK longitudinal cohort to
//! area-level data:
//! - Geocoding postcodes to British National Grid coordinates via postcodes.io
//! - Building Nomisweb census query URLs from the published dataset metadata
//! - Attaching DEFRA PCM annual pollution values by nearest 1km grid cell
//!
//! Every network access goes through the [`fetch::Fetch`] trait, so the
//! scraping and linking components run unchanged against saved pages.

pub mod config;
pub mod constants;
pub mod defra;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod html;
pub mod models;
pub mod nomis;
pub mod table;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{LinkerConfig, MatchPolicy};
pub use defra::{DefraClient, LinkedRecords, ReferenceGrid};
pub use error::{LinkerError, Result};
pub use fetch::{Fetch, HttpFetcher, HttpResponse, StaticFetcher};
pub use geocode::Geocoder;
pub use models::{GeocodeOutcome, Pollutant, PollutantCatalogueEntry, PollutantSelection};
pub use nomis::{NomisClient, QueryPlan};
