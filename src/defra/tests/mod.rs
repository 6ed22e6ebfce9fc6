//! Fixtures for the PCM linker tests

use crate::config::LinkerConfig;
use crate::fetch::StaticFetcher;
use crate::table::{CsvSource, read_csv_bytes};
use polars::prelude::DataFrame;


pub const HOST: &str = "https://defra.test";
pub const CATALOGUE_URL: &str = "https://defra.test/data/pcm-data";
pub const GRID_URL: &str = "https://defra.test/datastore/pcm/mappm102001.csv";

/// Grid cells as (ukgridcode, x, y)
pub const CELLS: &[(&str, &str, &str)] = &[
    ("54979", "458500", "1220500"),
    ("54980", "459500", "1220500"),
    ("54000", "458500", "1219500"),
    ("1", "503500", "484500"),
    ("2", "452500", "337500"),
    ("3", "498500", "143500"),
    ("4", "503500", "485500"),
];

pub fn catalogue_page() -> String {
    let row = |pollutant: &str, year: &str, metric: &str, label: &str, comment: &str| {
        format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"../datastore/pcm/map{}.csv\">CSV</a></td></tr>\n",
            pollutant, year, metric, label, comment, label
        )
    };
    let header = "<tr><th>Pollutant</th><th>Year</th><th>Metric</th><th>Header</th>\
                  <th>Comments</th><th>Download</th></tr>\n";

    let pm10 = [
        row("pm10", "2001", "Annual mean", "pm102001", "TEOM units"),
        row("pm10", "2001", "Days greater than 50", "pm10ex2001", "TEOM units"),
        row("pm10", "2008", "Annual mean", "pm102008g", "Gravimetric units"),
        row("pm10", "2018", "Annual mean", "pm102018g", "Gravimetric units"),
    ]
    .concat();
    let pm25 = [
        row("PM2.5", "2002", "Annual mean", "pm252002", " "),
        row("PM2.5", "2008", "Annual mean", "pm252008g", ""),
        row("PM2.5", "2018", "Annual mean", "pm252018g", ""),
    ]
    .concat();
    let ozone = row("Ozone", "2008", "DGT120", "dgt12008", "Days above 120");

    format!(
        "<html><body>\
         <table class=\"data\">{header}{pm10}</table>\
         <table class=\"data\">{header}{pm25}</table>\
         <table class=\"data\"><tr><td>Archived</td><td>see older page</td></tr></table>\
         <table class=\"data\">{header}{ozone}</table>\
         <table class=\"layout\"><tr><td>menu</td></tr></table>\
         </body></html>"
    )
}

/// A PCM file over [`CELLS`]; cells without a value are written as MISSING
pub fn pcm_csv(label: &str, values: &[(&str, &str)]) -> String {
    let mut content = String::from(
        "Modelled background pollution data\nUK-AIR\nunits ugm-3\ngrid 1km\nsource PCM\n",
    );
    content.push_str(&format!("ukgridcode,x,y,{}\n", label));
    for (code, x, y) in CELLS {
        let value = values
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, v)| *v)
            .unwrap_or("MISSING");
        content.push_str(&format!("{},{},{},{}\n", code, x, y, value));
    }
    content
}

fn data_url(label: &str) -> String {
    format!("{}/datastore/pcm/map{}.csv", HOST, label)
}

pub fn defra_fetcher() -> StaticFetcher {
    StaticFetcher::new()
        .with_page(CATALOGUE_URL, catalogue_page())
        .with_page(GRID_URL, pcm_csv("pm102001", &[("1", "20.1"), ("2", "30.1")]))
        .with_page(
            data_url("pm252002"),
            pcm_csv("pm252002", &[("1", "12.4"), ("2", "22.4")]),
        )
        .with_page(
            data_url("pm102008g"),
            pcm_csv("pm102008g", &[("1", "99.0"), ("2", "18.5"), ("3", "17.0")]),
        )
        .with_page(
            data_url("pm252008g"),
            pcm_csv("pm252008g", &[("2", "11.2")]),
        )
        .with_page(
            data_url("pm102018g"),
            pcm_csv("pm102018g", &[("3", "14.2")]),
        )
        .with_page(
            data_url("pm252018g"),
            pcm_csv("pm252018g", &[("3", "9.8")]),
        )
}

pub fn test_config() -> LinkerConfig {
    LinkerConfig::default().with_defra_endpoints(CATALOGUE_URL, HOST, GRID_URL)
}

/// Geocoded participants, one of them with a rejected postcode
pub fn participants() -> DataFrame {
    let content = "id_twin,year,postcode,eastings,northings,country\n\
                   1191,1998,YO12 4JR,503065,484333,England\n\
                   10771,2008,NG9 1AH,452432,337099,England\n\
                   10772,2018,GU8 4AR,498970,143163,England\n\
                   10773,2008,XX1 1XX,Invalid postcode,Invalid postcode,Invalid postcode\n";
    read_csv_bytes(content.as_bytes().to_vec(), CsvSource::default()).unwrap()
}
