//! DEFRA PCM pollution linker
//!
//! Scrapes the modelled background pollution catalogue, picks the data
//! year closest to each cohort year and attaches per-pollutant annual
//! values to participants through their nearest 1km grid cell.

use crate::config::LinkerConfig;
use crate::error::{LinkerError, Result};
use crate::fetch::Fetch;
use crate::models::{Pollutant, PollutantCatalogueEntry, PollutantSelection};
use crate::table::{CsvSource, read_csv_bytes};
use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

pub mod catalogue;
pub mod grid;
pub mod linker;

#[cfg(test)]
pub mod tests;

pub use grid::ReferenceGrid;

/// Participants joined with pollution values
#[derive(Debug)]
pub struct LinkedRecords {
    pub frame: DataFrame,
    /// Sources used, one per cohort year and pollutant
    pub selections: Vec<PollutantSelection>,
    /// Records without a grid cell, present with null values
    pub unmatched: usize,
    pub files_downloaded: usize,
}

/// Client for the PCM catalogue and data files
#[derive(Debug)]
pub struct DefraClient<F> {
    fetcher: F,
    catalogue: Vec<PollutantCatalogueEntry>,
    grid: ReferenceGrid,
    header_offset: usize,
}

impl<F: Fetch> DefraClient<F> {
    /// Scrape the catalogue and load the reference grid
    pub async fn connect(fetcher: F, config: &LinkerConfig) -> Result<Self> {
        let url = &config.defra_catalogue_url;
        let html = fetcher.get(url).await?.into_text(url)?;
        let catalogue = catalogue::parse_catalogue(&html, url, &config.defra_host)?;
        info!("PCM catalogue lists {} files", catalogue.len());

        let url = &config.reference_grid_url;
        let bytes = fetcher.get(url).await?.into_success(url)?;
        let frame = read_csv_bytes(
            bytes,
            CsvSource::default().with_header_offset(config.pcm_header_offset),
        )?;
        let grid = ReferenceGrid::from_frame(&frame, config.grid_tolerance)?;
        info!("Reference grid has {} cells", grid.len());

        Ok(Self {
            fetcher,
            catalogue,
            grid,
            header_offset: config.pcm_header_offset,
        })
    }

    pub fn catalogue(&self) -> &[PollutantCatalogueEntry] {
        &self.catalogue
    }

    pub fn grid(&self) -> &ReferenceGrid {
        &self.grid
    }

    /// Every catalogue entry eligible for `pollutant` in `cohort_year`
    pub fn select(&self, pollutant: Pollutant, cohort_year: &str) -> Vec<PollutantSelection> {
        catalogue::select_for_year(&self.catalogue, pollutant.catalogue_name(), cohort_year)
    }

    /// One source per numeric cohort year and pollutant.
    ///
    /// The first eligible entry is used; a numeric year without any is an
    /// error. Non-numeric years are skipped and their records stay unlinked.
    pub fn plan(&self, years: &[String], pollutants: &[Pollutant]) -> Result<Vec<PollutantSelection>> {
        let mut plan = Vec::with_capacity(years.len() * pollutants.len());
        for year in years {
            if !linker::is_numeric_year(year) {
                warn!("Cohort year '{}' is not numeric, its records get no pollution values", year);
                continue;
            }
            for &pollutant in pollutants {
                let selection = self.select(pollutant, year).into_iter().next().ok_or_else(|| {
                    LinkerError::NoPollutantData {
                        pollutant: pollutant.to_string(),
                        year: year.clone(),
                    }
                })?;
                plan.push(selection);
            }
        }
        Ok(plan)
    }

    /// Download one PCM data file
    pub async fn fetch_table(&self, entry: &PollutantCatalogueEntry) -> Result<DataFrame> {
        let url = &entry.download_link;
        let bytes = self.fetcher.get(url).await?.into_success(url)?;
        read_csv_bytes(bytes, CsvSource::default().with_header_offset(self.header_offset))
    }

    /// Attach one column per pollutant to every record with a cohort year.
    ///
    /// Years are linked independently, each against its own source file,
    /// then unioned.
    pub async fn link(&self, records: &DataFrame, pollutants: &[Pollutant]) -> Result<LinkedRecords> {
        let years = linker::cohort_years(records)?;
        let selections = self.plan(&years, pollutants)?;
        let (with_codes, unmatched) = linker::attach_grid_codes(records, &self.grid)?;

        let names: Vec<String> = pollutants.iter().map(|p| p.to_string()).collect();
        let mut frames = Vec::with_capacity(years.len());
        let mut files_downloaded = 0;
        for year in &years {
            let mut frame = linker::records_for_year(&with_codes, year);
            if !linker::is_numeric_year(year) {
                frames.push(linker::null_pollutants(frame, &names));
                continue;
            }
            for selection in selections.iter().filter(|s| s.cohort_year == year.trim()) {
                let entry = &selection.entry;
                debug!(
                    "Linking {} for cohort year {} from {} ({})",
                    entry.pollutant, year, entry.year, entry.download_link
                );
                let table = self.fetch_table(entry).await?;
                files_downloaded += 1;
                let values = linker::pollution_values(&table, &entry.pollutant)?;
                frame = linker::join_pollutant(frame, values);
            }
            frames.push(frame);
        }

        let frame = linker::union_years(frames)?;
        info!(
            "Linked {} records across {} cohort years",
            frame.height(),
            years.len()
        );

        Ok(LinkedRecords {
            frame,
            selections,
            unmatched,
            files_downloaded,
        })
    }
}
