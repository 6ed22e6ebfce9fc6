//! Table extraction from scraped HTML pages.
//!
//! Both the Nomis definitions pages and the DEFRA catalogue are plain
//! `<table>` layouts; this module turns them into rows of trimmed cell
//! text so the page-specific code only deals with strings.

use scraper::{ElementRef, Html, Selector};

/// A table row: trimmed `<td>` texts plus the first anchor target, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<String>,
    pub link: Option<String>,
}

impl Row {
    /// Cells with empty text removed
    pub fn non_empty_cells(&self) -> Vec<&str> {
        self.cells
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub fn first_cell(&self) -> Option<&str> {
        self.cells.first().map(String::as_str)
    }
}

/// All rows of one `<table>`, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    /// Text of the first cell of the first row
    pub fn marker(&self) -> Option<&str> {
        self.rows.first().and_then(Row::first_cell)
    }

    /// Key/value pairs from rows with at least two non-empty cells
    pub fn key_values(&self) -> Vec<(String, String)> {
        self.rows
            .iter()
            .filter_map(|row| {
                let cells = row.non_empty_cells();
                match cells.as_slice() {
                    [key, value, ..] => Some((key.to_string(), value.to_string())),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Parse every table of the page
pub fn tables(html: &str) -> Vec<Table> {
    select_tables(html, "table")
}

/// Parse the tables carrying the given CSS class
pub fn tables_with_class(html: &str, class: &str) -> Vec<Table> {
    select_tables(html, &format!("table.{}", class))
}

/// Tables whose first cell reads exactly `marker`
pub fn tables_with_marker(html: &str, marker: &str) -> Vec<Table> {
    tables(html)
        .into_iter()
        .filter(|table| table.marker() == Some(marker))
        .collect()
}

fn select_tables(html: &str, selector: &str) -> Vec<Table> {
    let document = Html::parse_document(html);
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel), Ok(link_sel)) = (
        Selector::parse(selector),
        Selector::parse("tr"),
        Selector::parse("td"),
        Selector::parse("a[href]"),
    ) else {
        return Vec::new();
    };

    document
        .select(&table_sel)
        .map(|table| Table {
            rows: table
                .select(&row_sel)
                .filter(|row| belongs_to(row, &table))
                .map(|row| Row {
                    cells: row.select(&cell_sel).map(|td| cell_text(&td)).collect(),
                    link: row
                        .select(&link_sel)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(str::to_string),
                })
                .collect(),
        })
        .collect()
}

/// Rows of nested tables belong to the inner table only
fn belongs_to(row: &ElementRef<'_>, table: &ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
        .is_some_and(|owner| owner.id() == table.id())
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
