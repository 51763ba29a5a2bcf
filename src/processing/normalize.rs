//! Raw table → canonical records.

use chrono::NaiveDate;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{CanonicalField, CanonicalRecord, CanonicalTable, RawTable, Tenor};

use super::mapping::{Coercion, ColumnRule, DateOrder, Layout, SchemaMapping};
use super::parse::{parse_date, parse_number};

/// Normalize a raw table with `mapping`.
///
/// Rows whose date does not parse are dropped; other unparseable cells become null. Columns
/// not named by the mapping are discarded.
pub fn normalize(table: &RawTable, mapping: &SchemaMapping) -> PipelineResult<CanonicalTable> {
    let out = match &mapping.layout {
        Layout::Wide { date_column } => unpivot(table, mapping, date_column)?,
        Layout::Long { columns } => long(table, mapping, columns)?,
    };

    tracing::debug!(
        source = %mapping.source_id,
        raw_rows = table.row_count(),
        records = out.row_count(),
        "normalized"
    );
    Ok(out)
}

fn require_column(table: &RawTable, header: &str, source_id: &str) -> PipelineResult<usize> {
    table.index_of(header).ok_or_else(|| PipelineError::SchemaMismatch {
        message: format!(
            "{source_id}: column '{header}' not found (have: {})",
            table.headers.join(", ")
        ),
    })
}

fn unpivot(
    table: &RawTable,
    mapping: &SchemaMapping,
    date_column: &str,
) -> PipelineResult<CanonicalTable> {
    let date_idx = require_column(table, date_column, &mapping.source_id)?;
    let tenor_cols: Vec<(usize, &str)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != date_idx && !h.trim().is_empty())
        .map(|(i, h)| (i, h.trim()))
        .collect();

    let mut records = Vec::with_capacity(table.row_count() * tenor_cols.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(date) = parse_date(table.cell(row_idx, date_idx), mapping.date_order) else {
            continue;
        };
        for &(col, label) in &tenor_cols {
            records.push(CanonicalRecord {
                date,
                tenor: Some(Tenor::Label(label.to_string())),
                rate: row.get(col).and_then(|c| parse_number(c)),
                curve_type: mapping.curve_type.clone(),
                classification: None,
            });
        }
    }
    // Stable: tenor column order is kept within a date.
    records.sort_by_key(|r| r.date);

    Ok(CanonicalTable {
        columns: vec![
            CanonicalField::Date,
            CanonicalField::Tenor,
            CanonicalField::Rate,
            CanonicalField::CurveType,
        ],
        records,
    })
}

struct Resolved<'a> {
    rule: &'a ColumnRule,
    idx: usize,
}

fn long(
    table: &RawTable,
    mapping: &SchemaMapping,
    rules: &[ColumnRule],
) -> PipelineResult<CanonicalTable> {
    let mut resolved = Vec::with_capacity(rules.len());
    for rule in rules {
        match table.index_of(&rule.raw) {
            Some(idx) => resolved.push(Resolved { rule, idx }),
            None if rule.required => {
                require_column(table, &rule.raw, &mapping.source_id)?;
            }
            None => tracing::debug!(
                source = %mapping.source_id,
                column = %rule.raw,
                "optional column absent"
            ),
        }
    }

    let date_idx = resolved
        .iter()
        .find(|r| r.rule.field == CanonicalField::Date)
        .map(|r| r.idx)
        .ok_or_else(|| PipelineError::SchemaMismatch {
            message: format!("{}: no column maps to Date", mapping.source_id),
        })?;

    let mut records = Vec::with_capacity(table.row_count());
    for row_idx in 0..table.row_count() {
        let Some(date) = parse_date(table.cell(row_idx, date_idx), mapping.date_order) else {
            continue;
        };
        let mut record = CanonicalRecord {
            date,
            tenor: None,
            rate: None,
            curve_type: mapping.curve_type.clone(),
            classification: None,
        };
        for r in &resolved {
            apply(&mut record, r.rule, table.cell(row_idx, r.idx), mapping.date_order);
        }
        records.push(record);
    }

    let columns = CanonicalField::ALL
        .into_iter()
        .filter(|f| *f == CanonicalField::CurveType || resolved.iter().any(|r| r.rule.field == *f))
        .collect();

    Ok(CanonicalTable { columns, records })
}

fn apply(record: &mut CanonicalRecord, rule: &ColumnRule, cell: &str, order: DateOrder) {
    let text = || Some(cell.trim()).filter(|s| !s.is_empty()).map(str::to_string);
    match rule.field {
        CanonicalField::Date | CanonicalField::CurveType => {}
        CanonicalField::Tenor => {
            record.tenor = match rule.coercion {
                Coercion::Number => parse_number(cell).map(Tenor::Numeric),
                Coercion::Text => text().map(Tenor::Label),
                Coercion::Date => as_date_text(cell, order).map(Tenor::Label),
            }
        }
        CanonicalField::Rate => record.rate = parse_number(cell),
        CanonicalField::Classification => {
            record.classification = match rule.coercion {
                Coercion::Date => as_date_text(cell, order),
                Coercion::Number | Coercion::Text => text(),
            }
        }
    }
}

fn as_date_text(cell: &str, order: DateOrder) -> Option<String> {
    parse_date(cell, order).map(|d: NaiveDate| d.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::normalize;
    use crate::error::PipelineError;
    use crate::processing::mapping::builtin;
    use crate::types::{CanonicalField, CurveType, RawTable, Tenor};

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn mapping(source_id: &str) -> crate::processing::mapping::SchemaMapping {
        builtin().into_iter().find(|m| m.source_id == source_id).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn treasury_wide_row_becomes_one_record_per_tenor() {
        let raw = table(&["Date", "1 Mo", "2 Mo"], &[&["2025-01-01", "4.5", "4.6"]]);
        let out = normalize(&raw, &mapping("treasury")).unwrap();

        assert_eq!(out.row_count(), 2);
        assert_eq!(out.records[0].date, date(2025, 1, 1));
        assert_eq!(out.records[0].tenor, Some(Tenor::Label("1 Mo".to_string())));
        assert_eq!(out.records[0].rate, Some(4.5));
        assert_eq!(out.records[1].tenor, Some(Tenor::Label("2 Mo".to_string())));
        assert_eq!(out.records[1].rate, Some(4.6));
        assert!(out
            .records
            .iter()
            .all(|r| r.curve_type.as_str() == CurveType::TREASURY_USD));
        assert!(!out.has_column(CanonicalField::Classification));
    }

    #[test]
    fn treasury_rows_are_sorted_by_date_and_keep_column_order() {
        let raw = table(
            &["Date", "1 Mo", "2 Mo"],
            &[&["01/03/2025", "4.3", ""], &["01/02/2025", "4.4", "4.41"]],
        );
        let out = normalize(&raw, &mapping("treasury")).unwrap();

        let got: Vec<(NaiveDate, String, Option<f64>)> = out
            .records
            .iter()
            .map(|r| (r.date, r.tenor.as_ref().unwrap().to_string(), r.rate))
            .collect();
        assert_eq!(
            got,
            vec![
                (date(2025, 1, 2), "1 Mo".to_string(), Some(4.4)),
                (date(2025, 1, 2), "2 Mo".to_string(), Some(4.41)),
                (date(2025, 1, 3), "1 Mo".to_string(), Some(4.3)),
                (date(2025, 1, 3), "2 Mo".to_string(), None),
            ]
        );
    }

    #[test]
    fn bad_dates_are_dropped_and_bad_rates_kept_as_null() {
        let raw = table(
            &["Fecha de Proceso", "Plazo (DIAS)", "Tasas (%)", "Moneda"],
            &[
                &["not-a-date", "30", "4.1"],
                &["02/01/2025", "30", "n/a", "PEN"],
                &["02/01/2025", "60", "4.25", "PEN"],
            ],
        );
        let out = normalize(&raw, &mapping("curva_dolares")).unwrap();

        assert_eq!(out.row_count(), 2);
        let first = &out.records[0];
        assert_eq!(first.date, date(2025, 1, 2));
        assert_eq!(first.tenor, Some(Tenor::Numeric(30.0)));
        assert_eq!(first.rate, None);
        assert_eq!(out.records[1].rate, Some(4.25));
        assert_eq!(first.curve_type.as_str(), CurveType::CURVA_DOLARES_CCSDF);
        assert_eq!(
            out.columns,
            vec![
                CanonicalField::Date,
                CanonicalField::Tenor,
                CanonicalField::Rate,
                CanonicalField::CurveType
            ]
        );
    }

    #[test]
    fn soberana_keeps_classification_when_present() {
        let raw = table(
            &["Fecha de Proceso", "Tipo de Curva", "Indice de Spread", "Clasificación"],
            &[&["03/01/2025", "Soberana 10A", "1.23", "AAA"]],
        );
        let out = normalize(&raw, &mapping("sbs_soberana")).unwrap();

        assert!(out.has_column(CanonicalField::Classification));
        let r = &out.records[0];
        assert_eq!(r.date, date(2025, 1, 3));
        assert_eq!(r.tenor, Some(Tenor::Label("Soberana 10A".to_string())));
        assert_eq!(r.rate, Some(1.23));
        assert_eq!(r.classification.as_deref(), Some("AAA"));
    }

    #[test]
    fn soberana_without_classification_omits_the_column() {
        let raw = table(
            &["Fecha de Proceso", "Tipo de Curva", "Indice de Spread"],
            &[&["03/01/2025", "Soberana 10A", "1.23"]],
        );
        let out = normalize(&raw, &mapping("sbs_soberana")).unwrap();
        assert!(!out.has_column(CanonicalField::Classification));
        assert_eq!(out.records[0].classification, None);
    }

    #[test]
    fn missing_required_column_is_schema_mismatch() {
        let raw = table(&["Fecha", "Plazo (DIAS)", "Tasas (%)"], &[&["02/01/2025", "30", "4.1"]]);
        let err = normalize(&raw, &mapping("sbs_bcrp")).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("Fecha de Proceso"));

        let wide = table(&["When", "1 Mo"], &[&["2025-01-01", "4.5"]]);
        let err = normalize(&wide, &mapping("treasury")).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }
}
