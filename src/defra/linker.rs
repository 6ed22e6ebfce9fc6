//! Frame operations for attaching pollution values to participants

use super::grid::ReferenceGrid;
use crate::constants::{participant_columns, pcm_columns};
use crate::error::{LinkerError, Result};
use crate::table::{require_columns, string_values};
use polars::prelude::*;
use tracing::{debug, warn};

/// Whether a cohort year can be compared with catalogue years
pub fn is_numeric_year(year: &str) -> bool {
    year.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

/// Distinct non-empty cohort years in order of first appearance
pub fn cohort_years(records: &DataFrame) -> Result<Vec<String>> {
    let mut years: Vec<String> = Vec::new();
    for year in string_values(records, participant_columns::YEAR)?
        .into_iter()
        .flatten()
    {
        if !year.trim().is_empty() && !years.contains(&year) {
            years.push(year);
        }
    }
    Ok(years)
}

/// Append the nearest grid code of every record.
///
/// Returns the extended frame and the number of records left without a
/// grid cell.
pub fn attach_grid_codes(records: &DataFrame, grid: &ReferenceGrid) -> Result<(DataFrame, usize)> {
    require_columns(
        records,
        &[participant_columns::EASTINGS, participant_columns::NORTHINGS],
        "participant file",
    )?;

    let eastings = string_values(records, participant_columns::EASTINGS)?;
    let northings = string_values(records, participant_columns::NORTHINGS)?;

    let codes: Vec<Option<String>> = eastings
        .iter()
        .zip(&northings)
        .map(|(e, n)| grid.resolve(e.as_deref(), n.as_deref()).map(str::to_string))
        .collect();
    let unmatched = codes.iter().filter(|c| c.is_none()).count();

    if unmatched > 0 {
        warn!(
            "{} of {} records have no grid cell within {} m",
            unmatched,
            codes.len(),
            grid.tolerance()
        );
    }

    let mut frame = records.clone();
    frame.with_column(Column::new(pcm_columns::GRID_CODE.into(), codes))?;
    Ok((frame, unmatched))
}

/// Records collected in `year`
pub fn records_for_year(records: &DataFrame, year: &str) -> LazyFrame {
    records
        .clone()
        .lazy()
        .filter(col(participant_columns::YEAR).cast(DataType::String).eq(lit(year.to_string())))
}

/// Reduce a PCM table to its grid code and value columns.
///
/// The value column is the last one and is renamed to `pollutant`.
pub fn pollution_values(table: &DataFrame, pollutant: &str) -> Result<LazyFrame> {
    require_columns(
        table,
        &[pcm_columns::GRID_CODE, pcm_columns::X, pcm_columns::Y],
        "pollution table",
    )?;

    let value_column = table
        .get_column_names()
        .last()
        .map(|name| name.to_string())
        .filter(|name| {
            ![pcm_columns::GRID_CODE, pcm_columns::X, pcm_columns::Y].contains(&name.as_str())
        })
        .ok_or_else(|| {
            LinkerError::data_validation(format!("pollution table for {} has no value column", pollutant))
        })?;

    debug!("Using column '{}' as {}", value_column, pollutant);
    Ok(table.clone().lazy().select([
        col(pcm_columns::GRID_CODE).cast(DataType::String),
        col(value_column.as_str()).cast(DataType::Float64).alias(pollutant),
    ]))
}

/// Left join `values` onto `records` by grid code, keeping record order
pub fn join_pollutant(records: LazyFrame, values: LazyFrame) -> LazyFrame {
    records.join(
        values,
        [col(pcm_columns::GRID_CODE)],
        [col(pcm_columns::GRID_CODE)],
        JoinArgs { maintain_order: MaintainOrderJoin::Left, ..JoinArgs::new(JoinType::Left) },
    )
}

/// Add an all-null value column for every pollutant
pub fn null_pollutants(records: LazyFrame, pollutants: &[String]) -> LazyFrame {
    let columns: Vec<Expr> = pollutants
        .iter()
        .map(|p| lit(NULL).cast(DataType::Float64).alias(p.as_str()))
        .collect();
    records.with_columns(columns)
}

/// Union per-year frames and remove the grid code helper column
pub fn union_years(frames: Vec<LazyFrame>) -> Result<DataFrame> {
    if frames.is_empty() {
        return Err(LinkerError::data_validation(
            "participant file has no records with a cohort year",
        ));
    }
    let combined = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
    Ok(combined.drop(pcm_columns::GRID_CODE)?)
}
