#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

use super::grid_to_table;

/// Read one sheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into a [`RawTable`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Uses the `header_row`-th non-empty row as the header row
/// - Converts every cell to its display string; date cells become ISO dates
pub fn read_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    header_row: usize,
) -> PipelineResult<RawTable> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::MissingTable {
                message: format!("workbook has no sheets ({})", path.display()),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    let grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    grid_to_table(grid, header_row, &format!("{} sheet '{sheet}'", path.display()))
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => {
                ndt.date().format("%Y-%m-%d").to_string()
            }
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}
