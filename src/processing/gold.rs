//! Gold store: one canonical file per source, replaced wholesale on every publish.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::types::{CanonicalField, CanonicalRecord, CanonicalTable};

/// File format of gold output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoldFormat {
    Csv,
    /// Requires the `excel` feature.
    Xlsx,
}

impl Default for GoldFormat {
    fn default() -> Self {
        if cfg!(feature = "excel") {
            Self::Xlsx
        } else {
            Self::Csv
        }
    }
}

impl GoldFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Directory of canonical outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldStore {
    dir: PathBuf,
    format: GoldFormat,
}

impl GoldStore {
    pub fn new(dir: impl Into<PathBuf>, format: GoldFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> GoldFormat {
        self.format
    }

    pub fn ensure_dir(&self) -> PipelineResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.format.extension()))
    }

    /// Write `table` as `<name>.<ext>`, replacing any previous output.
    ///
    /// The file is written next to the target and renamed over it, so readers never observe a
    /// half-written gold file.
    pub fn publish(&self, name: &str, table: &CanonicalTable) -> PipelineResult<PathBuf> {
        let target = self.path_for(name);
        let partial = self
            .dir
            .join(format!(".{name}.{}.partial", self.format.extension()));

        let written = match self.format {
            GoldFormat::Csv => write_csv(&partial, table),
            GoldFormat::Xlsx => write_xlsx(&partial, table),
        };
        if let Err(e) = written.and_then(|()| fs::rename(&partial, &target).map_err(Into::into)) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        tracing::info!(path = %target.display(), records = table.row_count(), "gold file written");
        Ok(target)
    }
}

/// Text form of one canonical cell; `None` is an empty cell.
fn cell_text(record: &CanonicalRecord, field: CanonicalField) -> Option<String> {
    match field {
        CanonicalField::Date => Some(record.date.format("%Y-%m-%d").to_string()),
        CanonicalField::Tenor => record.tenor.as_ref().map(ToString::to_string),
        CanonicalField::Rate => record.rate.map(|r| r.to_string()),
        CanonicalField::CurveType => Some(record.curve_type.to_string()),
        CanonicalField::Classification => record.classification.clone(),
    }
}

fn write_csv(path: &Path, table: &CanonicalTable) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.columns.iter().map(|c| c.as_str()))?;
    for record in &table.records {
        wtr.write_record(
            table
                .columns
                .iter()
                .map(|&c| cell_text(record, c).unwrap_or_default()),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(feature = "excel")]
fn write_xlsx(path: &Path, table: &CanonicalTable) -> PipelineResult<()> {
    use chrono::Datelike;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    use crate::types::Tenor;

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let sheet = workbook.add_worksheet();
    for (col, field) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, field.as_str(), &header)?;
    }

    for (i, record) in table.records.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, &field) in table.columns.iter().enumerate() {
            let col = col as u16;
            match field {
                CanonicalField::Date => {
                    let d = record.date;
                    let dt = ExcelDateTime::from_ymd(
                        d.year() as u16,
                        d.month() as u8,
                        d.day() as u8,
                    )?;
                    sheet.write_datetime_with_format(row, col, &dt, &date_format)?;
                }
                CanonicalField::Tenor => match &record.tenor {
                    Some(Tenor::Numeric(v)) => {
                        sheet.write_number(row, col, *v)?;
                    }
                    Some(Tenor::Label(s)) => {
                        sheet.write_string(row, col, s)?;
                    }
                    None => {}
                },
                CanonicalField::Rate => {
                    if let Some(v) = record.rate {
                        sheet.write_number(row, col, v)?;
                    }
                }
                CanonicalField::CurveType | CanonicalField::Classification => {
                    if let Some(s) = cell_text(record, field) {
                        sheet.write_string(row, col, &s)?;
                    }
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(not(feature = "excel"))]
fn write_xlsx(_path: &Path, _table: &CanonicalTable) -> PipelineResult<()> {
    Err(crate::error::PipelineError::config(
        "xlsx gold output not enabled (enable cargo feature 'excel')",
    ))
}
