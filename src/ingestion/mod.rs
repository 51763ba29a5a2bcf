//! Raw file readers.
//!
//! Most callers should use [`read_raw_table`] (from [`unified`]) which:
//!
//! - detects the file format from its extension, sniffing `.xls` files that are really HTML
//!   exports
//! - reads the first table (or sheet) into a [`crate::types::RawTable`] of string cells
//! - uses the configured header row, after discarding fully empty rows
//!
//! Format-specific readers are also available under:
//! - [`csv`]
//! - [`html`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod html;
pub mod unified;

pub use unified::{read_raw_table, RawFormat, ReadOptions};

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

/// Turn a grid of cells into a [`RawTable`] using `header_row` as the header.
///
/// Fully empty rows are dropped first so that blank spacer rows in exports do not shift the
/// header. Data rows are padded/truncated to the header width.
pub(crate) fn grid_to_table(
    grid: Vec<Vec<String>>,
    header_row: usize,
    origin: &str,
) -> PipelineResult<RawTable> {
    let mut rows: Vec<Vec<String>> = grid
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .collect();

    if rows.len() <= header_row {
        return Err(PipelineError::MissingTable {
            message: format!(
                "{origin}: expected a header at row {header_row} but found {} non-empty rows",
                rows.len()
            ),
        });
    }

    let data = rows.split_off(header_row + 1);
    let headers: Vec<String> = rows
        .pop()
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let width = headers.len();
    let data = data
        .into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect();

    Ok(RawTable::new(headers, data))
}

#[cfg(test)]
mod tests {
    use super::grid_to_table;
    use crate::error::PipelineError;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_row_skips_title_and_blank_rows() {
        let g = grid(&[
            &["Consulta Historica", ""],
            &["", ""],
            &["Fecha de Proceso", "Tasas (%)"],
            &["02/01/2025", "4.5", "extra"],
            &["03/01/2025"],
        ]);
        let table = grid_to_table(g, 1, "test").unwrap();
        assert_eq!(table.headers, vec!["Fecha de Proceso", "Tasas (%)"]);
        assert_eq!(table.rows[0], vec!["02/01/2025", "4.5"]);
        assert_eq!(table.rows[1], vec!["03/01/2025", ""]);
    }

    #[test]
    fn too_few_rows_is_missing_table() {
        let err = grid_to_table(grid(&[&["only a title"]]), 1, "test").unwrap_err();
        assert!(matches!(err, PipelineError::MissingTable { .. }));
    }
}
