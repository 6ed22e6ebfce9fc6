//! Postcode geocoding through postcodes.io.
//!
//! Participant files hold one postcode column per collection year. They
//! are reshaped to one row per (participant, year), geocoded with a
//! bounded number of concurrent lookups and written back in input order.

use crate::config::LinkerConfig;
use crate::constants::participant_columns;
use crate::error::{LinkerError, Result};
use crate::fetch::Fetch;
use crate::models::GeocodeOutcome;
use crate::table::{require_columns, string_values};
use futures::{StreamExt, TryStreamExt, stream};
use indicatif::ProgressBar;
use polars::prelude::{Column, DataFrame};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

/// Matches the collection year in a postcode column name
const YEAR_PATTERN: &str = "[12][0-9]{3}";

/// One postcode of one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostcodeRecord {
    pub id: String,
    pub year: String,
    pub postcode: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedRecord {
    pub id: String,
    pub year: String,
    pub outcome: GeocodeOutcome,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    result: Option<LookupResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    postcode: String,
    eastings: Option<i64>,
    northings: Option<i64>,
    country: Option<String>,
}

/// Remove whitespace and non-word characters
pub fn clean_postcode(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Postcode columns and the year each one names
pub fn postcode_columns(df: &DataFrame, id_column: &str) -> Result<Vec<(String, String)>> {
    let year = Regex::new(YEAR_PATTERN).map_err(|source| LinkerError::InvalidPattern {
        pattern: YEAR_PATTERN.to_string(),
        source,
    })?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .filter(|c| c != id_column)
        .collect();

    let with_years: Vec<(String, Option<String>)> = columns
        .iter()
        .map(|c| (c.clone(), year.find(c).map(|m| m.as_str().to_string())))
        .collect();

    if columns.is_empty() || with_years.iter().any(|(_, y)| y.is_none()) {
        return Err(LinkerError::data_validation(format!(
            "postcode column names must include the collection year, e.g. 'Postcodes2008'; found: {}",
            columns.join(", ")
        )));
    }

    Ok(with_years
        .into_iter()
        .filter_map(|(column, year)| Some((column, year?)))
        .collect())
}

/// Reshape a wide postcode file to one record per participant and year.
///
/// Records with a missing id or postcode are dropped.
pub fn reshape_long(df: &DataFrame, id_column: &str) -> Result<Vec<PostcodeRecord>> {
    require_columns(df, &[id_column], "postcode file")?;
    let columns = postcode_columns(df, id_column)?;
    let ids = string_values(df, id_column)?;

    let mut records = Vec::with_capacity(ids.len() * columns.len());
    for (column, year) in &columns {
        info!("Column {} assumed to hold postcodes from {}", column, year);
        for (id, postcode) in ids.iter().zip(string_values(df, column)?) {
            let (Some(id), Some(postcode)) = (id, postcode) else {
                continue;
            };
            if postcode.trim().is_empty() {
                continue;
            }
            records.push(PostcodeRecord {
                id: id.clone(),
                year: year.clone(),
                postcode,
            });
        }
    }

    debug!("Reshaped {} rows into {} postcode records", df.height(), records.len());
    Ok(records)
}

/// Geocoding client
#[derive(Debug)]
pub struct Geocoder<F> {
    fetcher: F,
    base_url: String,
}

impl<F: Fetch> Geocoder<F> {
    pub fn new(fetcher: F, config: &LinkerConfig) -> Self {
        Self {
            fetcher,
            base_url: config.postcodes_url.clone(),
        }
    }

    /// Look up one postcode.
    ///
    /// Rejections by the service are outcomes, not errors; only
    /// transport failures and unreadable responses fail.
    pub async fn geocode(&self, postcode: &str) -> Result<GeocodeOutcome> {
        let url = format!("{}{}", self.base_url, clean_postcode(postcode));
        let response = self.fetcher.get(&url).await?;
        let status = response.status;

        let parsed: LookupResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(_) if !response.is_success() => {
                return Err(LinkerError::Http { url, status });
            }
            Err(source) => return Err(LinkerError::Json { url, source }),
        };

        if response.is_success() {
            let result = parsed
                .result
                .ok_or_else(|| LinkerError::schema_drift(&url, "response without 'result'"))?;
            Ok(GeocodeOutcome::Found {
                postcode: result.postcode,
                eastings: result.eastings,
                northings: result.northings,
                country: result.country.unwrap_or_default(),
            })
        } else {
            let message = parsed
                .error
                .ok_or(LinkerError::Http { url, status })?;
            debug!("Postcode '{}' rejected: {}", postcode, message);
            Ok(GeocodeOutcome::NotFound(message))
        }
    }

    /// Geocode every record with at most `workers` lookups in flight.
    ///
    /// Results keep the input order. The first failed lookup aborts.
    pub async fn geocode_all(
        &self,
        records: Vec<PostcodeRecord>,
        workers: usize,
        progress: &ProgressBar,
    ) -> Result<Vec<GeocodedRecord>> {
        stream::iter(records)
            .map(|record| async move {
                let outcome = self.geocode(&record.postcode).await?;
                progress.inc(1);
                Ok::<_, LinkerError>(GeocodedRecord {
                    id: record.id,
                    year: record.year,
                    outcome,
                })
            })
            .buffered(workers.max(1))
            .try_collect()
            .await
    }
}

/// Output frame with columns `[id, year, postcode, eastings, northings, country]`
pub fn geocoded_frame(id_column: &str, records: &[GeocodedRecord]) -> Result<DataFrame> {
    let mut ids = Vec::with_capacity(records.len());
    let mut years = Vec::with_capacity(records.len());
    let mut fields: [Vec<Option<String>>; 4] = Default::default();

    for record in records {
        ids.push(record.id.clone());
        years.push(record.year.clone());
        for (column, value) in fields.iter_mut().zip(record.outcome.fields()) {
            column.push(value);
        }
    }

    let [postcodes, eastings, northings, countries] = fields;
    Ok(DataFrame::new(vec![
        Column::new(id_column.into(), ids),
        Column::new(participant_columns::YEAR.into(), years),
        Column::new(participant_columns::POSTCODE.into(), postcodes),
        Column::new(participant_columns::EASTINGS.into(), eastings),
        Column::new(participant_columns::NORTHINGS.into(), northings),
        Column::new(participant_columns::COUNTRY.into(), countries),
    ])?)
}

/// Year by country counts with row and column totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<String, BTreeMap<String, usize>>,
    countries: BTreeSet<String>,
}

impl FrequencyTable {
    pub fn from_records(records: &[GeocodedRecord]) -> Self {
        let mut table = Self::default();
        for record in records {
            let [_, _, _, country] = record.outcome.fields();
            let Some(country) = country else { continue };
            *table
                .counts
                .entry(record.year.clone())
                .or_default()
                .entry(country.clone())
                .or_default() += 1;
            table.countries.insert(country);
        }
        table
    }

    pub fn count(&self, year: &str, country: &str) -> usize {
        self.counts
            .get(year)
            .and_then(|row| row.get(country))
            .copied()
            .unwrap_or(0)
    }

    pub fn year_total(&self, year: &str) -> usize {
        self.counts.get(year).map(|row| row.values().sum()).unwrap_or(0)
    }

    pub fn country_total(&self, country: &str) -> usize {
        self.counts.values().filter_map(|row| row.get(country)).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.values().flat_map(|row| row.values()).sum()
    }
}

impl fmt::Display for FrequencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec![participant_columns::YEAR.to_string()];
        header.extend(self.countries.iter().cloned());
        header.push("All".to_string());

        let mut rows: Vec<Vec<String>> = self
            .counts
            .keys()
            .map(|year| {
                let mut row = vec![year.clone()];
                row.extend(self.countries.iter().map(|c| self.count(year, c).to_string()));
                row.push(self.year_total(year).to_string());
                row
            })
            .collect();
        let mut totals = vec!["All".to_string()];
        totals.extend(self.countries.iter().map(|c| self.country_total(c).to_string()));
        totals.push(self.total().to_string());
        rows.push(totals);

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                rows.iter()
                    .map(|r| r[i].len())
                    .chain(std::iter::once(header[i].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!(" {:>w$} ", c, w = w))
                .collect();
            format!("|{}|", padded.join("|"))
        };
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();

        writeln!(f, "{}", line(&header))?;
        writeln!(f, "|{}|", rule.join("+"))?;
        for row in &rows {
            writeln!(f, "{}", line(row))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::table::{CsvSource, read_csv_bytes};

    const BASE: &str = "https://postcodes.test/postcodes/";

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with_page(
                format!("{}CH53HJ", BASE),
                r#"{"status":200,"result":{"postcode":"CH5 3HJ","eastings":331379,"northings":366865,"country":"Wales"}}"#,
            )
            .with_page(
                format!("{}YO124JR", BASE),
                r#"{"status":200,"result":{"postcode":"YO12 4JR","eastings":503065,"northings":484333,"country":"England"}}"#,
            )
            .with_response(
                format!("{}CH53HJ4", BASE),
                404,
                r#"{"status":404,"error":"Invalid postcode"}"#,
            )
            .with_response(format!("{}BROKEN", BASE), 502, "<html>Bad gateway</html>")
    }

    fn geocoder() -> Geocoder<StaticFetcher> {
        Geocoder::new(fetcher(), &LinkerConfig::default().with_postcodes_url(BASE))
    }

    #[test]
    fn test_clean_postcode() {
        assert_eq!(clean_postcode("CH5 3HJ"), "CH53HJ");
        assert_eq!(clean_postcode(" ch5,3hj "), "ch53hj");
        assert_eq!(clean_postcode("12321"), "12321");
    }

    #[tokio::test]
    async fn test_geocode_found_and_rejected() {
        let geocoder = geocoder();

        let found = geocoder.geocode("CH5,3HJ").await.unwrap();
        assert_eq!(
            found,
            GeocodeOutcome::Found {
                postcode: "CH5 3HJ".to_string(),
                eastings: Some(331379),
                northings: Some(366865),
                country: "Wales".to_string(),
            }
        );

        let rejected = geocoder.geocode("CH5 3HJ4").await.unwrap();
        assert_eq!(rejected.fields(), std::array::from_fn(|_| Some("Invalid postcode".to_string())));
    }

    #[tokio::test]
    async fn test_non_json_error_response_fails() {
        let err = geocoder().geocode("BROKEN").await.unwrap_err();
        assert!(matches!(err, LinkerError::Http { status: 502, .. }));
    }

    #[test]
    fn test_reshape_long_requires_years() {
        let content = "id,Postcodes1998,Postcodes2008\n1,YO12 4JR,CH5 3HJ\n2,NA,CH5 3HJ4\n";
        let df = read_csv_bytes(content.as_bytes().to_vec(), CsvSource::default()).unwrap();

        let records = reshape_long(&df, "id").unwrap();
        let years: Vec<&str> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["1998", "2008", "2008"]);
        assert_eq!(records[0].postcode, "YO12 4JR");

        let bad = read_csv_bytes(b"id,Postcodes\n1,CH5 3HJ\n".to_vec(), CsvSource::default()).unwrap();
        assert!(matches!(
            reshape_long(&bad, "id"),
            Err(LinkerError::DataValidation { .. })
        ));
        assert!(reshape_long(&df, "participant").is_err());
    }

    #[tokio::test]
    async fn test_geocode_all_keeps_order_and_builds_frame() {
        let records = vec![
            PostcodeRecord {
                id: "1".to_string(),
                year: "1998".to_string(),
                postcode: "YO12 4JR".to_string(),
            },
            PostcodeRecord {
                id: "2".to_string(),
                year: "2008".to_string(),
                postcode: "CH5 3HJ4".to_string(),
            },
            PostcodeRecord {
                id: "1".to_string(),
                year: "2008".to_string(),
                postcode: "CH5 3HJ".to_string(),
            },
        ];

        let geocoded = geocoder()
            .geocode_all(records, 3, &ProgressBar::hidden())
            .await
            .unwrap();
        let ids: Vec<&str> = geocoded.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "1"]);

        let frame = geocoded_frame("id_twin", &geocoded).unwrap();
        let names: Vec<String> = frame.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            vec!["id_twin", "year", "postcode", "eastings", "northings", "country"]
        );
        assert_eq!(
            string_values(&frame, "eastings").unwrap(),
            vec![
                Some("503065".to_string()),
                Some("Invalid postcode".to_string()),
                Some("331379".to_string())
            ]
        );

        let table = FrequencyTable::from_records(&geocoded);
        assert_eq!(table.count("2008", "Wales"), 1);
        assert_eq!(table.year_total("2008"), 2);
        assert_eq!(table.country_total("England"), 1);
        assert_eq!(table.total(), 3);
        assert!(table.to_string().contains("| All"));
    }
}
