//! Tests for query parameter assembly and result decoding

use super::ROOT;
use crate::error::LinkerError;
use crate::models::{CodeList, DatasetDefinition, DimensionRef};
use crate::nomis::query::{build_query, census_geography};
use polars::prelude::*;

fn dataset(dimensions: &[&str]) -> DatasetDefinition {
    DatasetDefinition {
        name: "QS119EW - Households by deprivation dimensions".to_string(),
        id: "NM_623_1".to_string(),
        dimensions: dimensions
            .iter()
            .map(|d| DimensionRef {
                name: d.to_string(),
                codelist: format!("CL_623_1_{}", d),
            })
            .collect(),
    }
}

fn codes(entries: &[(&str, &str)]) -> CodeList {
    entries.iter().copied().collect()
}

fn census_codelists(time: &[(&str, &str)]) -> Vec<(String, CodeList)> {
    vec![
        ("GEOGRAPHY".to_string(), codes(&[("2092957703", "England and Wales")])),
        ("RURAL_URBAN".to_string(), codes(&[("0", "Total"), ("2", "Urban")])),
        (
            "CELL".to_string(),
            codes(&[("0", "All households"), ("1", "Not deprived"), ("12", "Deprived in 4")]),
        ),
        ("MEASURES".to_string(), codes(&[("20100", "value"), ("20301", "percent")])),
        ("FREQ".to_string(), codes(&[("A", "Annually")])),
        ("TIME".to_string(), codes(time)),
    ]
}

#[test]
fn test_2011_census_query() {
    let plan = build_query(
        "QS119EW",
        &dataset(&["GEOGRAPHY", "RURAL_URBAN", "CELL", "MEASURES", "FREQ", "TIME"]),
        census_codelists(&[("2011", "2011")]),
        ROOT,
        "0x1234",
    )
    .unwrap();

    assert_eq!(
        plan.url,
        "https://nomis.test/api/v01/dataset/NM_623_1.data.csv?date=latest\
         &geography=1249902593...1249937345&rural_urban=0&cell=0,1,12&measures=20100\
         &select=record_count,geography_name,geography_code,obs_value,cell&uid=0x1234"
    );
    assert_eq!(plan.param("geography"), Some("1249902593...1249937345"));
    assert_eq!(plan.param("freq"), None);
    assert_eq!(plan.param("time"), None);
    assert_eq!(plan.dataset_id, "NM_623_1");
}

#[test]
fn test_2001_census_uses_2001_range_only() {
    let plan = build_query(
        "QS119EW",
        &dataset(&["GEOGRAPHY", "RURAL_URBAN", "CELL", "MEASURES", "FREQ", "TIME"]),
        census_codelists(&[("2001", "2001")]),
        ROOT,
        "key",
    )
    .unwrap();

    assert_eq!(plan.param("geography"), Some("1275068417...1275102794"));
    assert!(!plan.url.contains("1249902593"));
}

#[test]
fn test_census_geography_prefers_latest_year() {
    assert_eq!(
        census_geography(&codes(&[("2001", "2001"), ("2011", "2011")])).map(|(y, _)| y),
        Some("2011")
    );
    assert_eq!(
        census_geography(&codes(&[("1", "2001")])),
        Some(("2001", "1275068417...1275102794"))
    );
    assert_eq!(census_geography(&codes(&[("2015", "2015")])), None);
}

#[test]
fn test_non_census_time_leaves_geography_unfiltered() {
    let plan = build_query(
        "QS119EW",
        &dataset(&["GEOGRAPHY", "RURAL_URBAN", "CELL", "MEASURES", "FREQ", "TIME"]),
        census_codelists(&[("2015", "2015")]),
        ROOT,
        "key",
    )
    .unwrap();

    assert_eq!(plan.param("geography"), None);
    assert_eq!(plan.param("date"), Some("latest"));
}

#[test]
fn test_missing_geography_is_unsupported() {
    let result = build_query(
        "JSA",
        &dataset(&["SEX", "TIME"]),
        vec![
            ("SEX".to_string(), codes(&[("5", "Male")])),
            ("TIME".to_string(), codes(&[("2011", "2011")])),
        ],
        ROOT,
        "key",
    );

    assert!(matches!(result, Err(LinkerError::UnsupportedDataset { .. })));
}

#[test]
fn test_optional_dimensions_are_omitted() {
    let plan = build_query(
        "KS101EW",
        &dataset(&["GEOGRAPHY", "C_SEX", "C_AGE", "TIME"]),
        vec![
            ("GEOGRAPHY".to_string(), codes(&[("1", "x")])),
            ("C_SEX".to_string(), codes(&[("0", "All"), ("1", "Male"), ("2", "Female")])),
            ("C_AGE".to_string(), codes(&[("0", "All ages")])),
            ("TIME".to_string(), codes(&[("2011", "2011")])),
        ],
        ROOT,
        "key",
    )
    .unwrap();

    let keys: Vec<&str> = plan.params.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        keys,
        vec!["date", "geography", "c_sex", "c_age", "select", "uid"]
    );
    assert_eq!(plan.param("c_sex"), Some("0,1,2"));
    assert_eq!(
        plan.param("select"),
        Some("record_count,geography_name,geography_code,obs_value,c_sex,c_age")
    );
    assert_eq!(plan.decode.len(), 2);
}

#[test]
fn test_decode_frame_adds_label_columns() {
    let plan = build_query(
        "KS101EW",
        &dataset(&["GEOGRAPHY", "C_SEX", "TIME"]),
        vec![
            ("GEOGRAPHY".to_string(), codes(&[("1", "x")])),
            ("C_SEX".to_string(), codes(&[("0", "All"), ("1", "Male"), ("2", "Female")])),
            ("TIME".to_string(), codes(&[("2011", "2011")])),
        ],
        ROOT,
        "key",
    )
    .unwrap();

    let mut df = df!(
        "GEOGRAPHY_CODE" => ["E01000001", "E01000001", "E01000002"],
        "C_SEX" => [1i64, 2, 9],
        "OBS_VALUE" => [700i64, 750, 10]
    )
    .unwrap();

    let added = plan.decode_frame(&mut df).unwrap();
    assert_eq!(added, 1);

    let labels = df.column("C_SEX_NAME").unwrap().str().unwrap();
    assert_eq!(labels.get(0), Some("Male"));
    assert_eq!(labels.get(1), Some("Female"));
    assert_eq!(labels.get(2), None);
}
