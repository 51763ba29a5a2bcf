//! Core data model types.
//!
//! Raw files are read into a [`RawTable`] (a header row plus string cells), normalized into
//! [`CanonicalRecord`]s, and every orchestrated unit reports a [`UnitResult`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A raw file published into a source's slot in the raw store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArtifact {
    /// Source the file belongs to.
    pub source_id: String,
    /// Location of the file inside the raw store.
    pub file_path: PathBuf,
    /// When the file was published.
    pub acquired_at: DateTime<Utc>,
    /// File size in bytes at publish time.
    pub byte_size: u64,
}

/// A field of the canonical output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalField {
    Date,
    Tenor,
    Rate,
    CurveType,
    Classification,
}

impl CanonicalField {
    /// All canonical fields in output order.
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::Date,
        CanonicalField::Tenor,
        CanonicalField::Rate,
        CanonicalField::CurveType,
        CanonicalField::Classification,
    ];

    /// Column header used in gold output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Tenor => "Tenor",
            Self::Rate => "Rate",
            Self::CurveType => "CurveType",
            Self::Classification => "Classification",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maturity of a curve point. Its meaning is defined by the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Tenor {
    /// Categorical label, e.g. a column header such as `"1 Mo"`.
    Label(String),
    /// Numeric term, e.g. a day count.
    Numeric(f64),
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(s) => f.write_str(s),
            Self::Numeric(v) => write!(f, "{v}"),
        }
    }
}

/// Tag identifying which rate series a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveType(pub String);

impl CurveType {
    pub const TREASURY_USD: &'static str = "Treasury_USD";
    pub const SBS_SOBERANA_SOLES: &'static str = "SBS_Soberana_Soles";
    pub const CD_BCRP_SOLES: &'static str = "CD_BCRP_Soles";
    pub const CURVA_DOLARES_CCSDF: &'static str = "Curva_Dolares_CCSDF";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized curve point shared by all sources.
///
/// `date` is always a valid calendar date; rows whose date cannot be parsed never become
/// records. `tenor` and `rate` may be `None` after lenient numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    pub tenor: Option<Tenor>,
    pub rate: Option<f64>,
    pub curve_type: CurveType,
    pub classification: Option<String>,
}

/// Normalizer output: the canonical columns present for this source, plus the records.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    /// Ordered subset of [`CanonicalField::ALL`].
    pub columns: Vec<CanonicalField>,
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, field: CanonicalField) -> bool {
        self.columns.contains(&field)
    }
}

/// Tabular content of a raw file, before any typing.
///
/// Every row is padded or truncated to the header width by the readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns the index of a column, comparing headers with whitespace collapsed.
    pub fn index_of(&self, header: &str) -> Option<usize> {
        let wanted = normalize_header(header);
        self.headers.iter().position(|h| normalize_header(h) == wanted)
    }

    /// Cell at `(row, col)`, or `""` when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Trim a header and collapse internal runs of whitespace to one space.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What a unit reports about its own run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub success: bool,
    pub message: String,
}

impl UnitOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of one orchestrated unit. Created once per unit and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
    pub unit_name: String,
    pub success: bool,
    pub message: String,
}

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Extraction,
    Transformation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction => f.write_str("extraction"),
            Self::Transformation => f.write_str("transformation"),
        }
    }
}

/// Aggregate result of running every unit of a phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    /// One entry per unit, in execution order.
    pub results: Vec<UnitResult>,
    /// Units that crashed rather than reporting a failure.
    pub crashes: usize,
    pub elapsed: Duration,
}

impl PhaseReport {
    /// Number of units whose result is unsuccessful (crashes included).
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// Summary of a complete two-phase run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub extraction: PhaseReport,
    pub transformation: PhaseReport,
    pub duration: Duration,
}

impl PipelineSummary {
    pub fn total_failures(&self) -> usize {
        self.extraction.failure_count() + self.transformation.failure_count()
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duration={:?}, extraction_failures={}/{}, transformation_failures={}/{}",
            self.duration,
            self.extraction.failure_count(),
            self.extraction.results.len(),
            self.transformation.failure_count(),
            self.transformation.results.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_header, RawTable};

    #[test]
    fn index_of_ignores_surrounding_and_repeated_whitespace() {
        let table = RawTable::new(
            vec![" Fecha de  Proceso ".to_string(), "Tasas (%)".to_string()],
            vec![],
        );
        assert_eq!(table.index_of("Fecha de Proceso"), Some(0));
        assert_eq!(table.index_of("Tasas (%)"), Some(1));
        assert_eq!(table.index_of("missing"), None);
    }

    #[test]
    fn cell_is_empty_for_short_rows() {
        let table = RawTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        );
        assert_eq!(table.cell(0, 0), "1");
        assert_eq!(table.cell(0, 1), "");
        assert_eq!(table.cell(5, 0), "");
        assert_eq!(normalize_header("\tA\n B "), "A B");
    }
}
