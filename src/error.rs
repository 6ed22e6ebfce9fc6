//! Error handling for linking operations.
//!
//! Provides error types with context for page scraping, query
//! construction, downloads and table processing failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Network error while requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP {status} returned by {url}")]
    Http { url: String, status: u16 },

    #[error("Unexpected page structure at {page}: {reason}")]
    SchemaDrift { page: String, reason: String },

    #[error("Dataset '{code}' is not supported: {reason}")]
    UnsupportedDataset { code: String, reason: String },

    #[error("No dataset matches '{pattern}'")]
    DatasetNotFound { pattern: String },

    #[error("Dataset pattern '{pattern}' is ambiguous, it matches: {}", .matches.join("; "))]
    AmbiguousDataset {
        pattern: String,
        matches: Vec<String>,
    },

    #[error("Invalid dataset pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("No {pollutant} data available for cohort year {year}")]
    NoPollutantData { pollutant: String, year: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Data validation error: {message}")]
    DataValidation { message: String },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl LinkerError {
    /// Create a schema drift error for the given page
    pub fn schema_drift(page: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaDrift {
            page: page.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a data validation error
    pub fn data_validation(message: impl Into<String>) -> Self {
        Self::DataValidation {
            message: message.into(),
        }
    }

    /// Create a network error for a failed request
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkerError>;
