//! Core data structures shared by the linking components.
//!
//! Defines the scraped catalogue entries, code lists, reference grid
//! cells and run statistics used throughout the library.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::POLLUTANTS;
use crate::error::LinkerError;

/// One dimension of a Nomis dataset and its code list reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRef {
    pub name: String,
    pub codelist: String,
}

/// A Nomis dataset definition scraped from a KeyFamily table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    /// Display name, e.g. "KS101EW - Usual resident population"
    pub name: String,
    /// Opaque dataset id, e.g. "NM_1603_1"
    pub id: String,
    /// Dimensions in page order
    pub dimensions: Vec<DimensionRef>,
}

impl DatasetDefinition {
    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d.name == name)
    }
}

/// Ordered code → label mapping for one dimension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeList {
    entries: Vec<(String, String)>,
}

impl CodeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a code, keeping its first position
    pub fn insert(&mut self, code: impl Into<String>, label: impl Into<String>) {
        let code = code.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((code, label)),
        }
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, label)| label.as_str())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, l)| (c.as_str(), l.as_str()))
    }

    /// True when `value` appears as a code or a label
    pub fn mentions(&self, value: &str) -> bool {
        self.entries.iter().any(|(c, l)| c == value || l == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Into<String>, L: Into<String>> FromIterator<(C, L)> for CodeList {
    fn from_iter<I: IntoIterator<Item = (C, L)>>(iter: I) -> Self {
        let mut list = CodeList::new();
        for (code, label) in iter {
            list.insert(code, label);
        }
        list
    }
}

/// A row of the DEFRA PCM catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantCatalogueEntry {
    /// Upper-cased pollutant name
    pub pollutant: String,
    /// Year the pollution data was collected, as published
    pub year: String,
    pub metric: String,
    /// Value column name in the downloadable CSV, e.g. "pm102008g"
    pub header_label: String,
    pub comment: Option<String>,
    pub download_link: String,
}

impl PollutantCatalogueEntry {
    pub fn numeric_year(&self) -> Option<f64> {
        self.year.trim().parse::<f64>().ok().filter(|y| y.is_finite())
    }
}

/// A catalogue entry chosen for a cohort year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantSelection {
    /// Year the participant postcodes were collected
    pub cohort_year: String,
    pub entry: PollutantCatalogueEntry,
}

/// A cell of the 1km British National Grid reference raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub code: String,
    pub x: f64,
    pub y: f64,
}

/// Pollutants supported by the PCM catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    Pm10,
    Pm25,
    No2,
    Nox,
    Co,
    So2,
    Ozone,
    Benzene,
}

impl Pollutant {
    /// Name as published in the catalogue (upper case)
    pub fn catalogue_name(&self) -> &'static str {
        match self {
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::No2 => "NO2",
            Pollutant::Nox => "NOX",
            Pollutant::Co => "CO",
            Pollutant::So2 => "SO2",
            Pollutant::Ozone => "OZONE",
            Pollutant::Benzene => "BENZENE",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.catalogue_name())
    }
}

impl FromStr for Pollutant {
    type Err = LinkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PM10" => Ok(Pollutant::Pm10),
            "PM2.5" => Ok(Pollutant::Pm25),
            "NO2" => Ok(Pollutant::No2),
            "NOX" => Ok(Pollutant::Nox),
            "CO" => Ok(Pollutant::Co),
            "SO2" => Ok(Pollutant::So2),
            "OZONE" => Ok(Pollutant::Ozone),
            "BENZENE" => Ok(Pollutant::Benzene),
            other => Err(LinkerError::data_validation(format!(
                "{} is not a valid pollutant. Valid pollutants: {}",
                other,
                POLLUTANTS.join(", ")
            ))),
        }
    }
}

/// Result of geocoding one postcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeocodeOutcome {
    Found {
        postcode: String,
        eastings: Option<i64>,
        northings: Option<i64>,
        country: String,
    },
    /// Lookup rejected by the service, with its message
    NotFound(String),
}

impl GeocodeOutcome {
    /// Output fields postcode, eastings, northings and country.
    ///
    /// A rejected lookup repeats the service message in every field.
    pub fn fields(&self) -> [Option<String>; 4] {
        match self {
            GeocodeOutcome::Found {
                postcode,
                eastings,
                northings,
                country,
            } => [
                Some(postcode.clone()),
                eastings.map(|e| e.to_string()),
                northings.map(|n| n.to_string()),
                Some(country.clone()),
            ],
            GeocodeOutcome::NotFound(message) => std::array::from_fn(|_| Some(message.clone())),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, GeocodeOutcome::Found { .. })
    }
}

/// Statistics reported at the end of a run
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub records_read: usize,
    pub records_written: usize,
    /// Records whose coordinates matched no grid cell
    pub unmatched_records: usize,
    pub files_downloaded: usize,
    pub output_paths: Vec<PathBuf>,
    pub processing_time_ms: u128,
}
