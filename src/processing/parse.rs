//! Lenient cell parsing shared by every normalizer.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::mapping::DateOrder;

const ISO_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];
const DAY_FIRST: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%d-%b-%Y", "%d %b %Y",
];
const MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%b %d, %Y", "%B %d, %Y"];

/// Parse a date cell. Returns `None` when nothing plausible matches.
///
/// ISO forms are tried first, then the mapping's preferred order, then the other order. A
/// trailing time part (`"2025-01-02 00:00:00"`, `"02/01/2025 10:15"`) is ignored.
pub fn parse_date(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    let date_part = s.split_whitespace().next().unwrap_or(s);

    let (preferred, other) = match order {
        DateOrder::DayFirst => (DAY_FIRST, MONTH_FIRST),
        DateOrder::MonthFirst => (MONTH_FIRST, DAY_FIRST),
    };

    [ISO_FORMATS, preferred, other]
        .into_iter()
        .flatten()
        .find_map(|fmt| {
            // Named-month formats contain spaces; try them against the whole cell.
            let candidate = if fmt.contains(' ') { s } else { date_part };
            NaiveDate::parse_from_str(candidate, fmt)
                .ok()
                .filter(plausible)
        })
}

fn plausible(date: &NaiveDate) -> bool {
    (1900..=2200).contains(&date.year())
}

/// Parse a numeric cell. Returns `None` for blanks, text and non-finite values.
///
/// `,` is treated as a thousands separator only when a `.` is also present, so `"1,234.5"`
/// parses but `"4,5"` does not.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches('%').trim();
    if s.is_empty() {
        return None;
    }
    let cleaned;
    let s = if s.contains(',') && s.contains('.') {
        cleaned = s.replace(',', "");
        cleaned.as_str()
    } else {
        s
    };
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
