//! Declarative per-source schema mappings.
//!
//! A [`SchemaMapping`] describes how one raw file becomes canonical records. The built-in
//! mappings cover the four normalized sources; a JSON file of mappings can override or extend
//! them without code changes.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{CanonicalField, CurveType};

/// Order of day and month in ambiguous `xx/xx/yyyy` dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

/// How a raw cell is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Lenient date; an unparseable value drops the row.
    Date,
    /// Lenient number; an unparseable value becomes null.
    Number,
    /// Trimmed text; empty becomes null.
    Text,
}

/// One raw column feeding one canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub raw: String,
    pub field: CanonicalField,
    pub coercion: Coercion,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ColumnRule {
    pub fn new(raw: impl Into<String>, field: CanonicalField, coercion: Coercion) -> Self {
        Self {
            raw: raw.into(),
            field,
            coercion,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Shape of the raw table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// One record per row; columns renamed and coerced per rule.
    Long { columns: Vec<ColumnRule> },
    /// One row per date, one column per tenor; un-pivoted into one record per (date, column).
    Wide { date_column: String },
}

/// Everything needed to normalize one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMapping {
    pub source_id: String,
    /// File name of the source's slot in the raw store.
    pub raw_file: String,
    /// Gold output name, without extension.
    pub gold_name: String,
    pub curve_type: CurveType,
    /// Header index among the non-empty rows of the raw table.
    #[serde(default)]
    pub header_row: usize,
    #[serde(default)]
    pub date_order: DateOrder,
    pub layout: Layout,
}

impl SchemaMapping {
    /// Check the mapping is usable before any file is read.
    pub fn validate(&self) -> PipelineResult<()> {
        let bad = |msg: String| {
            Err(PipelineError::config(format!("mapping '{}': {msg}", self.source_id)))
        };

        if self.source_id.trim().is_empty() {
            return Err(PipelineError::config("mapping with an empty source_id"));
        }
        if self.raw_file.trim().is_empty() || self.gold_name.trim().is_empty() {
            return bad("raw_file and gold_name must be set".to_string());
        }

        match &self.layout {
            Layout::Wide { date_column } if date_column.trim().is_empty() => {
                bad("wide layout needs a date_column".to_string())
            }
            Layout::Wide { .. } => Ok(()),
            Layout::Long { columns } => {
                let mut seen = BTreeSet::new();
                for rule in columns {
                    if rule.field == CanonicalField::CurveType {
                        return bad(format!(
                            "column '{}' cannot feed CurveType, it comes from curve_type",
                            rule.raw
                        ));
                    }
                    if !seen.insert(rule.field) {
                        return bad(format!("field {} is mapped twice", rule.field));
                    }
                }
                match columns.iter().find(|r| r.field == CanonicalField::Date) {
                    Some(rule) if rule.coercion == Coercion::Date && rule.required => Ok(()),
                    Some(_) => bad("the Date column must be a required date".to_string()),
                    None => bad("no column feeds Date".to_string()),
                }
            }
        }
    }
}

const SBS_DATE_COLUMN: &str = "Fecha de Proceso";

fn sbs_term_curve(source_id: &str, gold_name: &str, curve_type: &str) -> SchemaMapping {
    SchemaMapping {
        source_id: source_id.to_string(),
        raw_file: format!("{source_id}.xls"),
        gold_name: gold_name.to_string(),
        curve_type: CurveType::new(curve_type),
        header_row: 1,
        date_order: DateOrder::DayFirst,
        layout: Layout::Long {
            columns: vec![
                ColumnRule::new(SBS_DATE_COLUMN, CanonicalField::Date, Coercion::Date),
                ColumnRule::new("Plazo (DIAS)", CanonicalField::Tenor, Coercion::Number),
                ColumnRule::new("Tasas (%)", CanonicalField::Rate, Coercion::Number),
            ],
        },
    }
}

/// Mappings for the four normalized sources, in pipeline order.
pub fn builtin() -> Vec<SchemaMapping> {
    vec![
        SchemaMapping {
            source_id: "treasury".to_string(),
            raw_file: "Treasury.csv".to_string(),
            gold_name: "Treasury_Processed".to_string(),
            curve_type: CurveType::new(CurveType::TREASURY_USD),
            header_row: 0,
            date_order: DateOrder::MonthFirst,
            layout: Layout::Wide {
                date_column: "Date".to_string(),
            },
        },
        SchemaMapping {
            source_id: "sbs_soberana".to_string(),
            raw_file: "sbs_soberana.xls".to_string(),
            gold_name: "SBS_Soberana_Processed".to_string(),
            curve_type: CurveType::new(CurveType::SBS_SOBERANA_SOLES),
            header_row: 1,
            date_order: DateOrder::DayFirst,
            layout: Layout::Long {
                columns: vec![
                    ColumnRule::new(SBS_DATE_COLUMN, CanonicalField::Date, Coercion::Date),
                    ColumnRule::new("Tipo de Curva", CanonicalField::Tenor, Coercion::Text),
                    ColumnRule::new("Indice de Spread", CanonicalField::Rate, Coercion::Number),
                    ColumnRule::new("Clasificación", CanonicalField::Classification, Coercion::Text)
                        .optional(),
                ],
            },
        },
        sbs_term_curve("sbs_bcrp", "SBS_BCRP_Processed", CurveType::CD_BCRP_SOLES),
        sbs_term_curve("curva_dolares", "Curva_Dolares_Processed", CurveType::CURVA_DOLARES_CCSDF),
    ]
}

/// Read a JSON array of mappings.
pub fn load_mappings(path: impl AsRef<Path>) -> PipelineResult<Vec<SchemaMapping>> {
    let text = fs::read_to_string(path.as_ref())?;
    let mappings: Vec<SchemaMapping> = serde_json::from_str(&text)?;
    for m in &mappings {
        m.validate()?;
    }
    Ok(mappings)
}

/// Replace base mappings that share a `source_id` with an override; append the rest.
pub fn merge(mut base: Vec<SchemaMapping>, overrides: Vec<SchemaMapping>) -> Vec<SchemaMapping> {
    for m in overrides {
        match base.iter_mut().find(|b| b.source_id == m.source_id) {
            Some(slot) => *slot = m,
            None => base.push(m),
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{builtin, load_mappings, merge, DateOrder, Layout};
    use crate::error::PipelineError;
    use crate::types::CanonicalField;

    #[test]
    fn builtin_mappings_are_valid() {
        let all = builtin();
        assert_eq!(all.len(), 4);
        for m in &all {
            m.validate().unwrap();
        }
        assert_eq!(all[0].date_order, DateOrder::MonthFirst);
        assert!(matches!(all[0].layout, Layout::Wide { .. }));
    }

    #[test]
    fn json_overrides_replace_by_source_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        fs::write(
            &path,
            r#"[
              {
                "source_id": "sbs_bcrp",
                "raw_file": "sbs_bcrp.xls",
                "gold_name": "BCRP_v2",
                "curve_type": "CD_BCRP_Soles",
                "header_row": 2,
                "layout": {
                  "kind": "long",
                  "columns": [
                    {"raw": "Fecha", "field": "Date", "coercion": "date"},
                    {"raw": "Tasa", "field": "Rate", "coercion": "number", "required": false}
                  ]
                }
              }
            ]"#,
        )
        .unwrap();

        let merged = merge(builtin(), load_mappings(&path).unwrap());
        assert_eq!(merged.len(), 4);
        let bcrp = merged.iter().find(|m| m.source_id == "sbs_bcrp").unwrap();
        assert_eq!(bcrp.gold_name, "BCRP_v2");
        assert_eq!(bcrp.header_row, 2);
        assert_eq!(bcrp.date_order, DateOrder::DayFirst);
        let Layout::Long { columns } = &bcrp.layout else {
            panic!("expected long layout");
        };
        assert!(columns[0].required);
        assert!(!columns[1].required);
    }

    #[test]
    fn mapping_without_a_date_column_is_rejected() {
        let mut m = builtin().remove(2);
        if let Layout::Long { columns } = &mut m.layout {
            columns.retain(|r| r.field != CanonicalField::Date);
        }
        let err = m.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
        assert!(err.to_string().contains("no column feeds Date"));
    }
}
