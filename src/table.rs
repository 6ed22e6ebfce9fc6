//! Tabular I/O on top of polars.
//!
//! Downloads arrive as raw bytes with a data-source-specific preamble, and
//! participant files must keep identifiers and coordinates exactly as
//! written, so reads default to string columns.

use crate::constants::NULL_MARKERS;
use crate::error::{LinkerError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Options for reading a CSV into a `DataFrame`
#[derive(Debug, Clone, Copy)]
pub struct CsvSource {
    /// Lines to skip before the header row
    pub header_offset: usize,
    /// Keep every column as a string instead of inferring types
    pub all_strings: bool,
}

impl Default for CsvSource {
    fn default() -> Self {
        Self {
            header_offset: 0,
            all_strings: true,
        }
    }
}

impl CsvSource {
    pub fn with_header_offset(mut self, offset: usize) -> Self {
        self.header_offset = offset;
        self
    }

    pub fn inferred(mut self) -> Self {
        self.all_strings = false;
        self
    }

    fn read_options(&self) -> CsvReadOptions {
        let null_values = NullValues::AllColumns(NULL_MARKERS.iter().map(|s| (*s).into()).collect());
        let options = CsvReadOptions::default()
            .with_has_header(true)
            .with_skip_rows(self.header_offset)
            .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)));

        if self.all_strings {
            options.with_infer_schema_length(Some(0))
        } else {
            options.with_infer_schema_length(Some(10_000))
        }
    }
}

/// Read CSV content held in memory
pub fn read_csv_bytes(bytes: Vec<u8>, source: CsvSource) -> Result<DataFrame> {
    let df = source
        .read_options()
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    debug!("Read CSV with {} rows, columns {:?}", df.height(), df.get_column_names());
    Ok(df)
}

/// Read a CSV file from disk
pub fn read_csv_file(path: &Path, source: CsvSource) -> Result<DataFrame> {
    if !path.exists() {
        return Err(LinkerError::configuration(format!(
            "Input file does not exist: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    read_csv_bytes(bytes, source)
}

/// Write a frame as CSV, creating parent directories
pub fn write_csv(path: &Path, df: &mut DataFrame) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Require `names` to be columns of `df`
pub fn require_columns(df: &DataFrame, names: &[&str], context: &str) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| !present.iter().any(|p| p == name))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LinkerError::data_validation(format!(
            "{} is missing column(s) {}; found: {}",
            context,
            missing.join(", "),
            present.join(", ")
        )))
    }
}

/// Values of a column as optional strings, whatever its type
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}
