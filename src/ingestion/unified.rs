//! Unified raw-file reading.
//!
//! [`read_raw_table`] reads any supported raw file into a [`RawTable`]:
//!
//! - If [`ReadOptions::format`] is `None`, the format is inferred from the file extension.
//! - Spreadsheet extensions are sniffed: a file whose content starts with `<` is an HTML export
//!   and is read as such.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

use super::{csv, html};

/// Supported raw file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
    /// An HTML document containing a `<table>`.
    Html,
}

impl RawFormat {
    /// Parse a raw format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

/// Options controlling [`read_raw_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// If `None`, detect from extension and content.
    pub format: Option<RawFormat>,
    /// Index of the header among the non-empty rows.
    pub header_row: usize,
    /// Worksheet to read; the first sheet when `None`.
    pub sheet: Option<String>,
}

/// Read a raw file into a [`RawTable`].
pub fn read_raw_table(path: impl AsRef<Path>, options: &ReadOptions) -> PipelineResult<RawTable> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => detect_format(path)?,
    };

    tracing::debug!(
        path = %path.display(),
        ?format,
        header_row = options.header_row,
        "reading raw table"
    );

    match format {
        RawFormat::Csv => csv::read_csv_from_path(path, options.header_row),
        RawFormat::Html => html::read_html_from_path(path, options.header_row),
        RawFormat::Excel => read_excel_dispatch(path, options),
    }
}

/// Infer the format of `path` from its extension, sniffing spreadsheet files for HTML content.
pub fn detect_format(path: &Path) -> PipelineResult<RawFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PipelineError::MissingTable {
            message: format!("cannot infer format: path has no extension ({})", path.display()),
        })?;

    let format = RawFormat::from_extension(ext).ok_or_else(|| PipelineError::MissingTable {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })?;

    if format == RawFormat::Excel && looks_like_html(path)? {
        return Ok(RawFormat::Html);
    }
    Ok(format)
}

fn looks_like_html(path: &Path) -> PipelineResult<bool> {
    let mut head = [0u8; 512];
    let n = File::open(path)?.read(&mut head)?;
    let text = String::from_utf8_lossy(&head[..n]);
    Ok(text
        .trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with('<'))
}

fn read_excel_dispatch(path: &Path, options: &ReadOptions) -> PipelineResult<RawTable> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, options);

    #[cfg(feature = "excel")]
    {
        super::excel::read_excel_from_path(path, options.sheet.as_deref(), options.header_row)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(PipelineError::MissingTable {
            message: "excel reading not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
