//! Reference 1km grid and nearest-cell lookup

use crate::constants::pcm_columns;
use crate::error::{LinkerError, Result};
use crate::models::GridCell;
use crate::table::{require_columns, string_values};
use polars::prelude::DataFrame;
use tracing::debug;

/// Reference grid cells with an x-sorted index for nearest lookups
#[derive(Debug, Clone)]
pub struct ReferenceGrid {
    cells: Vec<GridCell>,
    /// Cell indices ordered by x, ties in original order
    by_x: Vec<usize>,
    tolerance: f64,
}

impl ReferenceGrid {
    pub fn new(cells: Vec<GridCell>, tolerance: f64) -> Self {
        let mut by_x: Vec<usize> = (0..cells.len()).collect();
        by_x.sort_by(|&a, &b| cells[a].x.total_cmp(&cells[b].x).then(a.cmp(&b)));
        Self {
            cells,
            by_x,
            tolerance,
        }
    }

    /// Build the grid from a PCM frame carrying `ukgridcode`, `x` and `y`.
    ///
    /// Rows with a missing code or non-numeric coordinates are dropped.
    pub fn from_frame(df: &DataFrame, tolerance: f64) -> Result<Self> {
        require_columns(
            df,
            &[pcm_columns::GRID_CODE, pcm_columns::X, pcm_columns::Y],
            "reference grid",
        )?;

        let codes = string_values(df, pcm_columns::GRID_CODE)?;
        let xs = string_values(df, pcm_columns::X)?;
        let ys = string_values(df, pcm_columns::Y)?;

        let cells: Vec<GridCell> = codes
            .into_iter()
            .zip(xs)
            .zip(ys)
            .filter_map(|((code, x), y)| {
                Some(GridCell {
                    code: code?,
                    x: parse_coordinate(x.as_deref())?,
                    y: parse_coordinate(y.as_deref())?,
                })
            })
            .collect();

        if cells.is_empty() {
            return Err(LinkerError::data_validation(
                "reference grid has no cells with numeric coordinates",
            ));
        }

        debug!(
            "Reference grid loaded: {} of {} rows usable",
            cells.len(),
            df.height()
        );
        Ok(Self::new(cells, tolerance))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Grid code of the nearest cell, or `None` when out of tolerance.
    ///
    /// Nearest in x first, keeping every tied cell, then the first of
    /// those nearest in y.
    pub fn nearest_grid_code(&self, easting: f64, northing: f64) -> Option<&str> {
        if !easting.is_finite() || !northing.is_finite() || self.by_x.is_empty() {
            return None;
        }

        let candidates = self.nearest_in_x(easting);
        let best = candidates.into_iter().min_by(|&a, &b| {
            let da = (self.cells[a].y - northing).abs();
            let db = (self.cells[b].y - northing).abs();
            da.total_cmp(&db).then(a.cmp(&b))
        })?;

        let cell = &self.cells[best];
        if (cell.x - easting).abs() > self.tolerance || (cell.y - northing).abs() > self.tolerance {
            return None;
        }
        Some(cell.code.as_str())
    }

    /// Like [`Self::nearest_grid_code`] for coordinates as written in a file
    pub fn resolve(&self, easting: Option<&str>, northing: Option<&str>) -> Option<&str> {
        self.nearest_grid_code(parse_coordinate(easting)?, parse_coordinate(northing)?)
    }

    /// Indices of every cell at the minimum |x - easting|
    fn nearest_in_x(&self, easting: f64) -> Vec<usize> {
        let x_of = |position: usize| self.cells[self.by_x[position]].x;
        let split = self.by_x.partition_point(|&i| self.cells[i].x < easting);

        let below = split.checked_sub(1).map(|p| (easting - x_of(p)).abs());
        let above = (split < self.by_x.len()).then(|| (x_of(split) - easting).abs());
        let best = match (below, above) {
            (Some(b), Some(a)) => b.min(a),
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return Vec::new(),
        };

        let mut selected = Vec::new();
        let mut position = split;
        while position > 0 && (easting - x_of(position - 1)).abs() == best {
            position -= 1;
            selected.push(self.by_x[position]);
        }
        let mut position = split;
        while position < self.by_x.len() && (x_of(position) - easting).abs() == best {
            selected.push(self.by_x[position]);
            position += 1;
        }
        selected
    }
}

fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
