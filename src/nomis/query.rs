//! Query construction for the Nomis CSV endpoint.
//!
//! Turns a dataset definition and its code lists into a download URL.
//! Geography, measures, rural/urban, frequency and time are fixed by
//! policy; every other dimension is requested in full.

use crate::constants::{CENSUS_LSOA_GEOGRAPHY, dimensions, query_policy};
use crate::error::{LinkerError, Result};
use crate::models::{CodeList, DatasetDefinition};
use crate::table::string_values;
use polars::prelude::{Column, DataFrame};
use serde::Serialize;
use tracing::{debug, warn};

/// A ready-to-fetch query and the mappings needed to read its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    /// Display name of the resolved dataset
    pub name: String,
    pub dataset_id: String,
    /// Code lists of the dimensions left in the output, for decoding
    pub decode: Vec<(String, CodeList)>,
    /// Query parameters in URL order
    pub params: Vec<(String, String)>,
    pub url: String,
}

impl QueryPlan {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Add a `<DIMENSION>_NAME` label column next to every coded column.
    ///
    /// Columns are matched case-insensitively since Nomis upper-cases
    /// headers. Unknown codes decode to null. Returns the number of
    /// columns added.
    pub fn decode_frame(&self, df: &mut DataFrame) -> Result<usize> {
        let mut added = 0;
        for (dimension, codes) in &self.decode {
            let Some(column) = df
                .get_column_names()
                .into_iter()
                .find(|c| c.eq_ignore_ascii_case(dimension))
                .map(|c| c.to_string())
            else {
                debug!("Column for dimension {} not present, not decoding", dimension);
                continue;
            };

            let labels: Vec<Option<String>> = string_values(df, &column)?
                .into_iter()
                .map(|code| code.and_then(|c| codes.label(c.trim()).map(str::to_string)))
                .collect();

            let label_column = format!("{}_NAME", column.to_uppercase());
            df.with_column(Column::new(label_column.into(), labels))?;
            added += 1;
        }
        Ok(added)
    }
}

/// Census geography range selected by the TIME dimension.
///
/// When several census years are present the most recent wins.
pub fn census_geography(time: &CodeList) -> Option<(&'static str, &'static str)> {
    CENSUS_LSOA_GEOGRAPHY
        .iter()
        .rev()
        .find(|(year, _)| time.mentions(year))
        .copied()
}

pub(crate) fn missing_geography(code: &str, dataset: &DatasetDefinition) -> LinkerError {
    LinkerError::UnsupportedDataset {
        code: code.to_string(),
        reason: format!(
            "'{}' has no {} dimension and cannot be filtered by area",
            dataset.name,
            dimensions::GEOGRAPHY
        ),
    }
}

/// Assemble the query for `dataset`.
///
/// `codelists` holds one entry per dataset dimension, in dimension order.
/// Fails when the dataset has no GEOGRAPHY dimension, since results
/// could not be linked to areas.
pub fn build_query(
    code: &str,
    dataset: &DatasetDefinition,
    mut codelists: Vec<(String, CodeList)>,
    root: &str,
    api_key: &str,
) -> Result<QueryPlan> {
    let mut take = |name: &str| -> Option<CodeList> {
        let index = codelists.iter().position(|(dim, _)| dim == name)?;
        Some(codelists.remove(index).1)
    };

    if take(dimensions::GEOGRAPHY).is_none() {
        return Err(missing_geography(code, dataset));
    }
    let measures = take(dimensions::MEASURES);
    let rural_urban = take(dimensions::RURAL_URBAN);
    let _freq = take(dimensions::FREQ);
    let time = take(dimensions::TIME);

    let mut params: Vec<(String, String)> = vec![(
        "date".to_string(),
        query_policy::LATEST_DATE.to_string(),
    )];

    match time.as_ref().and_then(census_geography) {
        Some((year, range)) => {
            debug!("{} covers census {}, using LSOA range {}", dataset.id, year, range);
            params.push(("geography".to_string(), range.to_string()));
        }
        None => warn!(
            "{} has no 2001/2011 census period, leaving geography unfiltered",
            dataset.id
        ),
    }

    if rural_urban.is_some() {
        params.push((
            "rural_urban".to_string(),
            query_policy::ALL_AREAS.to_string(),
        ));
    }

    for (dimension, codes) in &codelists {
        params.push((
            dimension.to_lowercase(),
            codes.codes().collect::<Vec<_>>().join(","),
        ));
    }

    if measures.is_some() {
        params.push((
            "measures".to_string(),
            query_policy::VALUE_MEASURE.to_string(),
        ));
    }

    let select: Vec<String> = query_policy::BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(codelists.iter().map(|(dimension, _)| dimension.to_lowercase()))
        .collect();
    params.push(("select".to_string(), select.join(",")));
    params.push(("uid".to_string(), api_key.to_string()));

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let url = format!("{}{}.data.csv?{}", root, dataset.id, query);

    Ok(QueryPlan {
        name: dataset.name.clone(),
        dataset_id: dataset.id.clone(),
        decode: codelists,
        params,
        url,
    })
}
