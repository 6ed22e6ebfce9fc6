//! Parsing of Nomis definition pages.
//!
//! Nomis publishes dataset and code list definitions as HTML tables whose
//! first cell names the table kind. The literal markers and bookkeeping
//! rows are the only contract, so they live in [`DefinitionLayout`] and
//! every mismatch is reported as schema drift.

use crate::config::MatchPolicy;
use crate::error::{LinkerError, Result};
use crate::html;
use crate::models::{CodeList, DatasetDefinition, DimensionRef};
use regex::Regex;
use tracing::{debug, warn};

/// Markers of one revision of the definitions page layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionLayout {
    pub version: &'static str,
    /// First cell of dataset definition tables
    pub dataset_marker: &'static str,
    /// First cell of code list tables
    pub codelist_marker: &'static str,
    pub id_key: &'static str,
    pub name_key: &'static str,
    /// Dataset rows that are links or headings rather than dimensions
    pub dataset_bookkeeping: &'static [&'static str],
    /// Code list rows that describe the list rather than a code
    pub codelist_bookkeeping: &'static [&'static str],
}

impl DefinitionLayout {
    pub const V01: DefinitionLayout = DefinitionLayout {
        version: "v01",
        dataset_marker: "KeyFamily",
        codelist_marker: "Codelist",
        id_key: "id",
        name_key: "Name",
        dataset_bookkeeping: &["Parent link", "Child link", "conceptRef"],
        codelist_bookkeeping: &["id", "value"],
    };
}

impl Default for DefinitionLayout {
    fn default() -> Self {
        Self::V01
    }
}

/// Datasets listed on the root definitions page, in page order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetIndex {
    datasets: Vec<DatasetDefinition>,
}

impl DatasetIndex {
    pub fn new(datasets: Vec<DatasetDefinition>) -> Self {
        Self { datasets }
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetDefinition> {
        self.datasets.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DatasetDefinition> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Find the dataset whose display name matches `pattern`.
    ///
    /// The pattern is a regular expression anchored at the start of the
    /// name. Several matches are resolved according to `policy`.
    pub fn resolve(&self, pattern: &str, policy: MatchPolicy) -> Result<&DatasetDefinition> {
        let matches: Vec<&DatasetDefinition> = match policy {
            MatchPolicy::Exact => self.datasets.iter().filter(|d| d.name == pattern).collect(),
            MatchPolicy::FirstOfMultiple | MatchPolicy::RejectAmbiguous => {
                let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|source| {
                    LinkerError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                self.datasets
                    .iter()
                    .filter(|d| regex.is_match(&d.name))
                    .collect()
            }
        };

        match matches.as_slice() {
            [] => Err(LinkerError::DatasetNotFound {
                pattern: pattern.to_string(),
            }),
            [only] => Ok(*only),
            [first, ..] if policy != MatchPolicy::RejectAmbiguous => {
                warn!(
                    "Pattern '{}' matches {} datasets, using '{}'",
                    pattern,
                    matches.len(),
                    first.name
                );
                Ok(*first)
            }
            _ => Err(LinkerError::AmbiguousDataset {
                pattern: pattern.to_string(),
                matches: matches.iter().map(|d| d.name.clone()).collect(),
            }),
        }
    }
}

/// Parse the root definitions page into a dataset index
pub fn parse_dataset_index(
    html: &str,
    page: &str,
    layout: &DefinitionLayout,
) -> Result<DatasetIndex> {
    let tables = html::tables_with_marker(html, layout.dataset_marker);
    if tables.is_empty() {
        return Err(LinkerError::schema_drift(
            page,
            format!(
                "no '{}' tables found (layout {})",
                layout.dataset_marker, layout.version
            ),
        ));
    }

    let mut datasets: Vec<DatasetDefinition> = Vec::with_capacity(tables.len());
    for table in tables {
        let mut id = None;
        let mut name = None;
        let mut dimensions = Vec::new();

        for (key, value) in table.key_values() {
            if key == layout.id_key {
                id = Some(value);
            } else if key == layout.name_key {
                name = Some(value);
            } else if key == layout.dataset_marker
                || layout.dataset_bookkeeping.contains(&key.as_str())
            {
                continue;
            } else {
                dimensions.retain(|d: &DimensionRef| d.name != key);
                dimensions.push(DimensionRef {
                    name: key,
                    codelist: value,
                });
            }
        }

        let (Some(id), Some(name)) = (id, name) else {
            return Err(LinkerError::schema_drift(
                page,
                format!(
                    "'{}' table without '{}' and '{}' rows (layout {})",
                    layout.dataset_marker, layout.id_key, layout.name_key, layout.version
                ),
            ));
        };

        let definition = DatasetDefinition {
            name,
            id,
            dimensions,
        };

        // A repeated display name replaces the earlier definition in place
        match datasets.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => *existing = definition,
            None => datasets.push(definition),
        }
    }

    debug!("Parsed {} dataset definitions from {}", datasets.len(), page);
    Ok(DatasetIndex::new(datasets))
}

/// Parse a dimension definitions page into its code list
pub fn parse_codelist(html: &str, page: &str, layout: &DefinitionLayout) -> Result<CodeList> {
    let tables = html::tables_with_marker(html, layout.codelist_marker);

    // Later tables override earlier ones
    let Some(table) = tables.last() else {
        return Err(LinkerError::schema_drift(
            page,
            format!(
                "no '{}' table found (layout {})",
                layout.codelist_marker, layout.version
            ),
        ));
    };

    let codes: CodeList = table
        .key_values()
        .into_iter()
        .filter(|(key, _)| {
            key != layout.codelist_marker && !layout.codelist_bookkeeping.contains(&key.as_str())
        })
        .collect();

    debug!("Parsed {} codes from {}", codes.len(), page);
    Ok(codes)
}
