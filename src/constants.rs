//! Application constants for the cohort linker
//!
//! This module contains endpoints, page markers, policy codes and
//! defaults used throughout the application.

// =============================================================================
// HTTP
// =============================================================================

/// User agent sent with every request; the DEFRA site rejects bare clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.3; WOW64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Safari/537.36";

// =============================================================================
// Nomisweb
// =============================================================================

/// Root of the Nomisweb dataset API (trailing slash required)
pub const NOMIS_ROOT_URL: &str = "https://www.nomisweb.co.uk/api/v01/dataset/";

/// Definitions page listing every dataset, relative to the root
pub const NOMIS_DEFINITIONS_PAGE: &str = "def.htm";

/// Environment variable consulted for the Nomis access key
pub const NOMIS_API_KEY_ENV: &str = "NOMIS_API_KEY";

/// Dimension names with special handling when building a query
pub mod dimensions {
    pub const GEOGRAPHY: &str = "GEOGRAPHY";
    pub const MEASURES: &str = "MEASURES";
    pub const RURAL_URBAN: &str = "RURAL_URBAN";
    pub const FREQ: &str = "FREQ";
    pub const TIME: &str = "TIME";
}

/// Fixed policy values used in generated queries
pub mod query_policy {
    /// Measures code selecting the raw observation value
    pub const VALUE_MEASURE: &str = "20100";

    /// Rural/urban code for "all areas"
    pub const ALL_AREAS: &str = "0";

    /// Date selection for every query
    pub const LATEST_DATE: &str = "latest";

    /// Columns always requested ahead of the dataset dimensions
    pub const BASE_COLUMNS: &[&str] = &[
        "record_count",
        "geography_name",
        "geography_code",
        "obs_value",
    ];
}

/// Columns of a downloaded and decoded Nomis table
pub mod nomis_columns {
    pub const GEOGRAPHY_CODE: &str = "GEOGRAPHY_CODE";
    pub const OBS_VALUE: &str = "OBS_VALUE";
    pub const CELL_NAME: &str = "CELL_NAME";
}

/// Punctuation runs replaced by a dot in cell labels before they become
/// column names
pub const CELL_NAME_SEPARATORS: &str = r"[(!?:;,)%*.]+";

/// Prefix of the merged census table when none is given
pub const DEFAULT_CENSUS_PREFIX: &str = "census";

/// Suffix of the merged census table written by the census command
pub const MERGED_CENSUS_SUFFIX: &str = "_nomisweb.csv";

/// Nomis geography id ranges of census LSOAs, keyed by census year.
///
/// These are Nomis-internal identifiers and change without notice.
pub const CENSUS_LSOA_GEOGRAPHY: &[(&str, &str)] = &[
    ("2001", "1275068417...1275102794"),
    ("2011", "1249902593...1249937345"),
];

// =============================================================================
// DEFRA PCM
// =============================================================================

/// Host prefixed to relative download links
pub const DEFRA_HOST: &str = "https://uk-air.defra.gov.uk";

/// Catalogue page of modelled background pollution data
pub const DEFRA_CATALOGUE_URL: &str = "https://uk-air.defra.gov.uk/data/pcm-data";

/// Reference 1km grid; any PCM file carries the same grid columns
pub const DEFRA_REFERENCE_GRID_URL: &str =
    "https://uk-air.defra.gov.uk/datastore/pcm/mappm102001.csv";

/// Number of preamble lines before the header in PCM CSV files
pub const PCM_HEADER_OFFSET: usize = 5;

/// Column names of PCM CSV files
pub mod pcm_columns {
    pub const GRID_CODE: &str = "ukgridcode";
    pub const X: &str = "x";
    pub const Y: &str = "y";
}

/// Maximum deviation, in metres, between a coordinate and its grid cell
pub const GRID_TOLERANCE_METRES: f64 = 1000.0;

/// Metrics accepted when selecting pollutant files
pub const ACCEPTED_METRICS: &[&str] = &["Annual mean", "DGT120"];

/// Pollutants published in the PCM catalogue
pub const POLLUTANTS: &[&str] = &[
    "PM10", "PM2.5", "NO2", "NOX", "CO", "SO2", "OZONE", "BENZENE",
];

/// Pollutants linked when none are specified
pub const DEFAULT_POLLUTANTS: &str = "PM10,PM2.5,NO2,NOX,SO2,OZONE,BENZENE";

// =============================================================================
// Geocoding and participant files
// =============================================================================

/// postcodes.io lookup endpoint (trailing slash required)
pub const POSTCODES_IO_URL: &str = "https://api.postcodes.io/postcodes/";

/// Values written by the geocoder that downstream readers treat as missing
pub const NULL_MARKERS: &[&str] = &[
    "NA",
    "NaN",
    "MISSING",
    "Postcode not found",
    "Invalid postcode",
];

/// Column names of geocoded participant files
pub mod participant_columns {
    pub const YEAR: &str = "year";
    pub const POSTCODE: &str = "postcode";
    pub const EASTINGS: &str = "eastings";
    pub const NORTHINGS: &str = "northings";
    pub const COUNTRY: &str = "country";
}

/// Default number of concurrent geocoding requests
pub const DEFAULT_GEOCODE_WORKERS: usize = 1;

/// Upper bound on concurrent geocoding requests
pub const MAX_GEOCODE_WORKERS: usize = 64;
