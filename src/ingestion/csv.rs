//! CSV reader.

use std::path::Path;

use crate::error::PipelineResult;
use crate::types::RawTable;

use super::grid_to_table;

/// Read a CSV file into a [`RawTable`].
///
/// Rules:
///
/// - Rows may have different lengths (the header row decides the width).
/// - Invalid UTF-8 is replaced rather than rejected.
/// - `header_row` counts non-empty rows from the top of the file.
pub fn read_csv_from_path(path: impl AsRef<Path>, header_row: usize) -> PipelineResult<RawTable> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    read_csv_from_reader(&mut rdr, header_row, &path.display().to_string())
}

/// Read CSV data from an existing CSV reader.
///
/// The reader should be built with `has_headers(false)`; header selection happens here.
pub fn read_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    header_row: usize,
    origin: &str,
) -> PipelineResult<RawTable> {
    let mut grid: Vec<Vec<String>> = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        grid.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).trim().to_string())
                .collect(),
        );
    }
    grid_to_table(grid, header_row, origin)
}
