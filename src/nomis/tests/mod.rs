//! Shared fixtures for Nomis tests

use crate::config::LinkerConfig;
use crate::fetch::StaticFetcher;

pub mod client_tests;
pub mod query_tests;

pub const ROOT: &str = "https://nomis.test/api/v01/dataset/";

/// Root definitions page with three datasets, one without GEOGRAPHY
pub fn definitions_page() -> String {
    r#"<html><body>
<table>
  <tr><td>KeyFamily</td></tr>
  <tr><td>id</td><td>NM_1603_1</td></tr>
  <tr><td>Name</td><td>KS101EW - Usual resident population</td></tr>
  <tr><td>Parent link</td><td>def.htm</td></tr>
  <tr><td>Child link</td><td>NM_1603_1.def.htm</td></tr>
  <tr><td>conceptRef</td><td>codelist</td></tr>
  <tr><td>GEOGRAPHY</td><td>CL_1603_1_GEOGRAPHY</td></tr>
  <tr><td>RURAL_URBAN</td><td>CL_1603_1_RURAL_URBAN</td></tr>
  <tr><td>CELL</td><td>CL_1603_1_CELL</td></tr>
  <tr><td>MEASURES</td><td>CL_1603_1_MEASURES</td></tr>
  <tr><td>FREQ</td><td>CL_1603_1_FREQ</td></tr>
  <tr><td>TIME</td><td>CL_1603_1_TIME</td></tr>
</table>
<table>
  <tr><td>KeyFamily</td></tr>
  <tr><td>id</td><td>NM_623_1</td></tr>
  <tr><td>Name</td><td>KS101EW - Usual resident population (2001)</td></tr>
  <tr><td>Parent link</td><td>def.htm</td></tr>
  <tr><td>Child link</td><td>NM_623_1.def.htm</td></tr>
  <tr><td>conceptRef</td><td>codelist</td></tr>
  <tr><td>GEOGRAPHY</td><td>CL_623_1_GEOGRAPHY</td></tr>
  <tr><td>C_SEX</td><td>CL_623_1_C_SEX</td></tr>
  <tr><td>TIME</td><td>CL_623_1_TIME</td></tr>
</table>
<table>
  <tr><td>KeyFamily</td></tr>
  <tr><td>id</td><td>NM_1_1</td></tr>
  <tr><td>Name</td><td>JSA - Jobseeker's Allowance</td></tr>
  <tr><td>Parent link</td><td>def.htm</td></tr>
  <tr><td>Child link</td><td>NM_1_1.def.htm</td></tr>
  <tr><td>conceptRef</td><td>codelist</td></tr>
  <tr><td>SEX</td><td>CL_1_1_SEX</td></tr>
  <tr><td>TIME</td><td>CL_1_1_TIME</td></tr>
</table>
<table>
  <tr><td>Notes</td><td>not a dataset</td></tr>
</table>
</body></html>"#
        .to_string()
}

/// A dimension page with one Codelist table
pub fn codelist_page(entries: &[(&str, &str)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(code, label)| format!("<tr><td>{}</td><td>{}</td></tr>\n", code, label))
        .collect();
    format!(
        "<html><body><table>\n<tr><td>Codelist</td></tr>\n\
         <tr><td>id</td><td>CL_X</td></tr>\n\
         <tr><td>value</td><td>description</td></tr>\n{}</table></body></html>",
        rows
    )
}

/// Fetcher serving the definitions page and every dimension page
pub fn nomis_fetcher() -> StaticFetcher {
    let page = |dataset: &str, dimension: &str| format!("{}{}/{}.def.htm", ROOT, dataset, dimension);

    StaticFetcher::new()
        .with_page(format!("{}def.htm", ROOT), definitions_page())
        .with_page(
            page("NM_1603_1", "GEOGRAPHY"),
            codelist_page(&[("2092957703", "England and Wales")]),
        )
        .with_page(
            page("NM_1603_1", "RURAL_URBAN"),
            codelist_page(&[("0", "Total"), ("2", "Urban"), ("3", "Rural")]),
        )
        .with_page(
            page("NM_1603_1", "CELL"),
            codelist_page(&[("0", "All usual residents"), ("1", "Males"), ("2", "Females")]),
        )
        .with_page(
            page("NM_1603_1", "MEASURES"),
            codelist_page(&[("20100", "value"), ("20301", "percent")]),
        )
        .with_page(page("NM_1603_1", "FREQ"), codelist_page(&[("A", "Annually")]))
        .with_page(page("NM_1603_1", "TIME"), codelist_page(&[("2011", "2011")]))
        .with_page(
            page("NM_623_1", "GEOGRAPHY"),
            codelist_page(&[("2092957703", "England and Wales")]),
        )
        .with_page(
            page("NM_623_1", "C_SEX"),
            codelist_page(&[("0", "All persons"), ("1", "Males"), ("2", "Females")]),
        )
        .with_page(page("NM_623_1", "TIME"), codelist_page(&[("2001", "2001")]))
}

pub fn test_config() -> LinkerConfig {
    LinkerConfig::default().with_nomis_root(ROOT)
}
