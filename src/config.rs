//! Configuration management and validation.
//!
//! Holds the endpoints, matching policy and tuning values shared by the
//! Nomis query builder, the DEFRA linker and the geocoder.

use crate::constants::{
    DEFAULT_GEOCODE_WORKERS, DEFAULT_USER_AGENT, DEFRA_CATALOGUE_URL, DEFRA_HOST,
    DEFRA_REFERENCE_GRID_URL, GRID_TOLERANCE_METRES, MAX_GEOCODE_WORKERS, NOMIS_ROOT_URL,
    PCM_HEADER_OFFSET, POSTCODES_IO_URL,
};
use crate::error::{LinkerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a dataset pattern is resolved against catalogue names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// The display name must equal the pattern
    Exact,
    /// Take the first name matching the pattern, in page order
    #[default]
    FirstOfMultiple,
    /// Fail when more than one name matches
    RejectAmbiguous,
}

impl FromStr for MatchPolicy {
    type Err = LinkerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "first" => Ok(Self::FirstOfMultiple),
            "reject-ambiguous" | "strict" => Ok(Self::RejectAmbiguous),
            other => Err(LinkerError::configuration(format!(
                "Unknown match policy '{}'. Expected one of: exact, first, reject-ambiguous",
                other
            ))),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::FirstOfMultiple => "first",
            Self::RejectAmbiguous => "reject-ambiguous",
        };
        f.write_str(name)
    }
}

/// Global configuration for linking runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Root of the Nomis dataset API, ending in '/'
    pub nomis_root: String,

    /// DEFRA PCM catalogue page
    pub defra_catalogue_url: String,

    /// Host prefixed to relative DEFRA download links
    pub defra_host: String,

    /// CSV carrying the reference 1km grid
    pub reference_grid_url: String,

    /// postcodes.io lookup endpoint, ending in '/'
    pub postcodes_url: String,

    /// User agent header for every request
    pub user_agent: String,

    /// Maximum x or y deviation accepted for a grid match
    pub grid_tolerance: f64,

    /// Preamble lines before the header row of PCM CSV files
    pub pcm_header_offset: usize,

    /// Dataset name resolution policy
    pub match_policy: MatchPolicy,

    /// Concurrent geocoding requests
    pub workers: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            nomis_root: NOMIS_ROOT_URL.to_string(),
            defra_catalogue_url: DEFRA_CATALOGUE_URL.to_string(),
            defra_host: DEFRA_HOST.to_string(),
            reference_grid_url: DEFRA_REFERENCE_GRID_URL.to_string(),
            postcodes_url: POSTCODES_IO_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            grid_tolerance: GRID_TOLERANCE_METRES,
            pcm_header_offset: PCM_HEADER_OFFSET,
            match_policy: MatchPolicy::default(),
            workers: DEFAULT_GEOCODE_WORKERS,
        }
    }
}

impl LinkerConfig {
    /// Point the Nomis client at a different API root
    pub fn with_nomis_root(mut self, root: impl Into<String>) -> Self {
        self.nomis_root = root.into();
        self
    }

    /// Point the DEFRA client at a different catalogue and host
    pub fn with_defra_endpoints(
        mut self,
        catalogue_url: impl Into<String>,
        host: impl Into<String>,
        reference_grid_url: impl Into<String>,
    ) -> Self {
        self.defra_catalogue_url = catalogue_url.into();
        self.defra_host = host.into();
        self.reference_grid_url = reference_grid_url.into();
        self
    }

    /// Point the geocoder at a different postcodes.io instance
    pub fn with_postcodes_url(mut self, url: impl Into<String>) -> Self {
        self.postcodes_url = url.into();
        self
    }

    /// Set the grid match tolerance
    pub fn with_grid_tolerance(mut self, tolerance: f64) -> Self {
        self.grid_tolerance = tolerance;
        self
    }

    /// Set the dataset match policy
    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    /// Set the number of concurrent geocoding requests
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check values that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(LinkerError::configuration(
                "Number of workers must be greater than 0",
            ));
        }

        if self.workers > MAX_GEOCODE_WORKERS {
            return Err(LinkerError::configuration(format!(
                "Number of workers cannot exceed {}",
                MAX_GEOCODE_WORKERS
            )));
        }

        if !(self.grid_tolerance.is_finite() && self.grid_tolerance > 0.0) {
            return Err(LinkerError::configuration(format!(
                "Grid tolerance must be a positive number, got {}",
                self.grid_tolerance
            )));
        }

        for (name, url) in [
            ("nomis_root", &self.nomis_root),
            ("defra_catalogue_url", &self.defra_catalogue_url),
            ("reference_grid_url", &self.reference_grid_url),
            ("postcodes_url", &self.postcodes_url),
        ] {
            if url.trim().is_empty() {
                return Err(LinkerError::configuration(format!("{} cannot be empty", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LinkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_tolerance, 1000.0);
        assert_eq!(config.pcm_header_offset, 5);
        assert_eq!(config.match_policy, MatchPolicy::FirstOfMultiple);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = LinkerConfig::default().with_workers(0);
        assert!(matches!(
            config.validate(),
            Err(LinkerError::Configuration { .. })
        ));
    }

    #[test]
    fn test_non_positive_tolerance_rejected() {
        assert!(LinkerConfig::default().with_grid_tolerance(0.0).validate().is_err());
        assert!(
            LinkerConfig::default()
                .with_grid_tolerance(f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_match_policy_parsing() {
        assert_eq!("exact".parse::<MatchPolicy>().unwrap(), MatchPolicy::Exact);
        assert_eq!(
            "First".parse::<MatchPolicy>().unwrap(),
            MatchPolicy::FirstOfMultiple
        );
        assert_eq!(
            "reject-ambiguous".parse::<MatchPolicy>().unwrap(),
            MatchPolicy::RejectAmbiguous
        );
        assert!("closest".parse::<MatchPolicy>().is_err());
        assert_eq!(MatchPolicy::RejectAmbiguous.to_string(), "reject-ambiguous");
    }
}
