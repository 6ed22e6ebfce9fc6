//! DEFRA PCM catalogue scraping and per-year source selection

use crate::constants::ACCEPTED_METRICS;
use crate::error::{LinkerError, Result};
use crate::html::{self, Table};
use crate::models::{PollutantCatalogueEntry, PollutantSelection};
use tracing::{debug, warn};

/// CSS class of the catalogue tables
pub const CATALOGUE_TABLE_CLASS: &str = "data";

/// Visible cells plus the trailing link cell of a catalogue row
const CATALOGUE_ROW_CELLS: usize = 6;

/// Parse every `table.data` of the PCM page into catalogue entries.
///
/// Tables with an unexpected row shape are skipped; a page without any
/// usable table is schema drift.
pub fn parse_catalogue(html: &str, page: &str, host: &str) -> Result<Vec<PollutantCatalogueEntry>> {
    let tables = html::tables_with_class(html, CATALOGUE_TABLE_CLASS);
    let mut entries = Vec::new();
    let mut usable = 0;

    for (index, table) in tables.iter().enumerate() {
        match table_entries(table, host) {
            Some(rows) => {
                usable += 1;
                entries.extend(rows);
            }
            None => warn!("Skipping catalogue table {} with unexpected layout", index),
        }
    }

    if usable == 0 {
        return Err(LinkerError::schema_drift(
            page,
            format!(
                "no 'table.{}' with {} cells per row and a download link",
                CATALOGUE_TABLE_CLASS, CATALOGUE_ROW_CELLS
            ),
        ));
    }

    debug!(
        "Parsed {} catalogue entries from {} of {} tables",
        entries.len(),
        usable,
        tables.len()
    );
    Ok(entries)
}

fn table_entries(table: &Table, host: &str) -> Option<Vec<PollutantCatalogueEntry>> {
    let rows: Vec<_> = table.rows.iter().filter(|row| !row.cells.is_empty()).collect();
    if rows.is_empty() {
        return None;
    }

    rows.into_iter()
        .map(|row| {
            if row.cells.len() != CATALOGUE_ROW_CELLS {
                return None;
            }
            let href = row.link.as_deref()?;
            let comment = row.cells[4].trim();

            Some(PollutantCatalogueEntry {
                pollutant: row.cells[0].to_uppercase(),
                year: row.cells[1].clone(),
                metric: row.cells[2].clone(),
                header_label: row.cells[3].clone(),
                comment: (!comment.is_empty()).then(|| comment.to_string()),
                download_link: download_link(host, href),
            })
        })
        .collect()
}

/// Absolute download link for a catalogue anchor
pub fn download_link(host: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    format!("{}{}", host.trim_end_matches('/'), href.replace("..", ""))
}

/// Entries for `pollutant` whose year is nearest to `cohort_year`.
///
/// Every entry at the minimum distance is kept, then only accepted
/// metrics remain. A non-numeric cohort year selects nothing.
pub fn select_for_year(
    entries: &[PollutantCatalogueEntry],
    pollutant: &str,
    cohort_year: &str,
) -> Vec<PollutantSelection> {
    let Some(target) = cohort_year
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|y| y.is_finite())
    else {
        warn!("Cohort year '{}' is not numeric, no pollution data selected", cohort_year);
        return Vec::new();
    };

    let pollutant = pollutant.to_uppercase();
    let candidates: Vec<(f64, &PollutantCatalogueEntry)> = entries
        .iter()
        .filter(|e| e.pollutant == pollutant)
        .filter_map(|e| e.numeric_year().map(|year| ((year - target).abs(), e)))
        .collect();

    let Some(nearest) = candidates
        .iter()
        .map(|(distance, _)| *distance)
        .min_by(f64::total_cmp)
    else {
        return Vec::new();
    };

    candidates
        .into_iter()
        .filter(|(distance, _)| *distance == nearest)
        .map(|(_, entry)| entry)
        .filter(|entry| ACCEPTED_METRICS.contains(&entry.metric.as_str()))
        .map(|entry| PollutantSelection {
            cohort_year: cohort_year.trim().to_string(),
            entry: entry.clone(),
        })
        .collect()
}
