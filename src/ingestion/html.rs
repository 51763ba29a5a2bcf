//! HTML table reader.
//!
//! Several regulators serve their "Excel" downloads as an HTML page containing a `<table>`
//! with an `.xls` extension. This reader extracts those tables with `scraper`.

use std::path::Path;

use scraper::{ElementRef, Html, Selector};

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

use super::grid_to_table;

/// Decode raw bytes as UTF-8, falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Extract every `<table>` in `html` as a grid of trimmed cell strings.
///
/// Rows belonging to nested tables are attributed to the nested table only.
pub fn extract_tables(html: &str) -> PipelineResult<Vec<Vec<Vec<String>>>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let mut tables = Vec::new();
    for table in document.select(&table_sel) {
        let mut grid = Vec::new();
        for row in table.select(&row_sel) {
            if !belongs_to(&row, &table, "table") {
                continue;
            }
            let cells: Vec<String> = row
                .select(&cell_sel)
                .filter(|cell| belongs_to(cell, &row, "tr"))
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .collect();
            grid.push(cells);
        }
        tables.push(grid);
    }
    Ok(tables)
}

/// Read the first usable HTML table of a file into a [`RawTable`].
///
/// A table is usable when it has more non-empty rows than `header_row`.
pub fn read_html_from_path(path: impl AsRef<Path>, header_row: usize) -> PipelineResult<RawTable> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    read_html_from_str(&decode_text(&bytes), header_row, &path.display().to_string())
}

/// Read the first usable HTML table of an in-memory document.
pub fn read_html_from_str(html: &str, header_row: usize, origin: &str) -> PipelineResult<RawTable> {
    let tables = extract_tables(html)?;
    if tables.is_empty() {
        return Err(PipelineError::MissingTable {
            message: format!("{origin}: no <table> element found"),
        });
    }

    let mut last_err = None;
    for grid in tables {
        match grid_to_table(grid, header_row, origin) {
            Ok(table) => return Ok(table),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| PipelineError::MissingTable {
        message: format!("{origin}: no usable table"),
    }))
}

fn selector(css: &str) -> PipelineResult<Selector> {
    Selector::parse(css).map_err(|e| PipelineError::MissingTable {
        message: format!("invalid selector '{css}': {e}"),
    })
}

/// True when the closest `tag` ancestor of `el` is `owner`.
fn belongs_to(el: &ElementRef<'_>, owner: &ElementRef<'_>, tag: &str) -> bool {
    el.ancestors()
        .find(|n| n.value().as_element().is_some_and(|e| e.name() == tag))
        .is_some_and(|n| n.id() == owner.id())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
