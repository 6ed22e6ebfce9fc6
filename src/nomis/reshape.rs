//! Reshaping of decoded Nomis downloads into one row per area

use crate::constants::{CELL_NAME_SEPARATORS, nomis_columns};
use crate::error::{LinkerError, Result};
use crate::table::{require_columns, string_values};
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

/// Column-safe form of a cell label: punctuation runs and spaces become dots
pub fn clean_cell_name(label: &str, separators: &Regex) -> String {
    separators.replace_all(label, ".").replace(' ', ".")
}

fn separators() -> Result<Regex> {
    Regex::new(CELL_NAME_SEPARATORS).map_err(|source| LinkerError::InvalidPattern {
        pattern: CELL_NAME_SEPARATORS.to_string(),
        source,
    })
}

/// Pivot a decoded table to one row per `GEOGRAPHY_CODE`.
///
/// Each distinct cleaned cell label becomes a column named
/// `<table>.<label>` holding the mean observation value, in label order.
/// Rows are sorted by geography code.
pub fn wide_table(frame: &DataFrame, table: &str) -> Result<DataFrame> {
    use nomis_columns::{CELL_NAME, GEOGRAPHY_CODE, OBS_VALUE};

    require_columns(
        frame,
        &[GEOGRAPHY_CODE, OBS_VALUE, CELL_NAME],
        &format!("{} download", table),
    )?;

    let separators = separators()?;
    let cells: Vec<Option<String>> = string_values(frame, CELL_NAME)?
        .into_iter()
        .map(|label| label.map(|l| clean_cell_name(&l, &separators)))
        .collect();
    let names: BTreeSet<String> = cells.iter().flatten().cloned().collect();
    if names.is_empty() {
        return Err(LinkerError::data_validation(format!(
            "{} download has no labelled cells",
            table
        )));
    }

    let mut long = frame.select([GEOGRAPHY_CODE, OBS_VALUE])?;
    long.with_column(Column::new(CELL_NAME.into(), cells))?;

    let columns: Vec<Expr> = names
        .iter()
        .map(|name| {
            col(OBS_VALUE)
                .filter(col(CELL_NAME).eq(lit(name.clone())))
                .mean()
                .alias(format!("{}.{}", table, name))
        })
        .collect();

    let wide = long
        .lazy()
        .with_column(col(OBS_VALUE).cast(DataType::Float64))
        .filter(col(GEOGRAPHY_CODE).is_not_null())
        .group_by([col(GEOGRAPHY_CODE)])
        .agg(columns)
        .sort([GEOGRAPHY_CODE], SortMultipleOptions::default())
        .collect()?;

    debug!(
        "Reshaped {} to {} areas and {} cells",
        table,
        wide.height(),
        names.len()
    );
    Ok(wide)
}

/// Inner join wide tables on `GEOGRAPHY_CODE`, keeping areas present in all
pub fn merge_tables(tables: Vec<DataFrame>) -> Result<DataFrame> {
    let key = nomis_columns::GEOGRAPHY_CODE;
    let mut frames = tables.into_iter().map(|table| table.lazy());
    let Some(first) = frames.next() else {
        return Err(LinkerError::data_validation("no census tables to merge"));
    };

    let merged = frames.fold(first, |merged, next| {
        merged.join(
            next,
            [col(key)],
            [col(key)],
            JoinArgs { maintain_order: MaintainOrderJoin::Left, ..JoinArgs::new(JoinType::Inner) },
        )
    });
    Ok(merged.collect()?)
}
