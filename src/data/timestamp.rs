//! Timestamp parsing for table cells.
//!
//! Two flavours exist:
//!
//! * **strict** – one caller-supplied chrono pattern, applied after removing a
//!   trailing locale marker such as `Uhr`. Meant for known fixed-format
//!   exports where every cell must match.
//! * **permissive** – the pattern is auto-detected per column from a built-in
//!   candidate list; individual cells may fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::{CellValue, Column};

/// Per-cell parse result for one column, aligned with its rows.
pub type ParsedColumn = Vec<Option<NaiveDateTime>>;

// ---------------------------------------------------------------------------
// Candidate formats for auto-detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    /// RFC 3339 / ISO 8601 with a zone offset; the wall clock of the offset is kept.
    Rfc3339,
    DateTime(&'static str),
    Date(&'static str),
}

/// Auto-detection order. On a tie the earlier entry wins, so month-first
/// slash dates are preferred over day-first ones.
const CANDIDATES: &[Candidate] = &[
    Candidate::DateTime("%Y-%m-%d %H:%M:%S"),
    Candidate::DateTime("%Y-%m-%dT%H:%M:%S"),
    Candidate::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    Candidate::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    Candidate::DateTime("%Y-%m-%d %H:%M"),
    Candidate::DateTime("%Y-%m-%dT%H:%M"),
    Candidate::Rfc3339,
    Candidate::Date("%Y-%m-%d"),
    Candidate::DateTime("%Y/%m/%d %H:%M:%S"),
    Candidate::DateTime("%Y/%m/%d %H:%M"),
    Candidate::Date("%Y/%m/%d"),
    Candidate::DateTime("%m/%d/%Y %H:%M:%S"),
    Candidate::DateTime("%m/%d/%Y %H:%M"),
    Candidate::Date("%m/%d/%Y"),
    Candidate::DateTime("%d/%m/%Y %H:%M:%S"),
    Candidate::DateTime("%d/%m/%Y %H:%M"),
    Candidate::Date("%d/%m/%Y"),
    Candidate::DateTime("%d.%m.%Y %H:%M:%S"),
    Candidate::DateTime("%d.%m.%Y %H:%M"),
    Candidate::Date("%d.%m.%Y"),
    Candidate::DateTime("%d-%m-%Y %H:%M:%S"),
    Candidate::DateTime("%d-%m-%Y %H:%M"),
    Candidate::Date("%d-%m-%Y"),
];

impl Candidate {
    /// The date half of the pattern (field order and separators).
    fn date_layout(self) -> &'static str {
        match self {
            Candidate::Rfc3339 => "%Y-%m-%d",
            Candidate::DateTime(fmt) | Candidate::Date(fmt) => {
                fmt.split(|c: char| c == ' ' || c == 'T').next().unwrap_or(fmt)
            }
        }
    }

    fn parse(self, s: &str) -> Option<NaiveDateTime> {
        match self {
            Candidate::Rfc3339 => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local()),
            Candidate::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
            Candidate::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

// ---------------------------------------------------------------------------
// Strict parsing
// ---------------------------------------------------------------------------

/// Remove one trailing marker word (case-insensitive), e.g. `"08:00 Uhr"`.
pub fn strip_trailing_marker<'a>(s: &'a str, markers: &[String]) -> &'a str {
    let trimmed = s.trim();
    for marker in markers {
        let marker = marker.trim();
        if marker.is_empty() || trimmed.len() <= marker.len() {
            continue;
        }
        let split = trimmed.len() - marker.len();
        if !trimmed.is_char_boundary(split) {
            continue;
        }
        let (head, tail) = trimmed.split_at(split);
        if tail.eq_ignore_ascii_case(marker) {
            return head.trim_end();
        }
    }
    trimmed
}

/// Parse one string under a fixed pattern, after stripping a trailing marker.
/// Date-only patterns yield midnight.
pub fn parse_strict(s: &str, pattern: &str, markers: &[String]) -> Option<NaiveDateTime> {
    let stripped = strip_trailing_marker(s, markers);
    NaiveDateTime::parse_from_str(stripped, pattern)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(stripped, pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a whole column under `pattern`. Every non-missing cell must parse
/// and at least one must be present, otherwise `None`.
pub fn strict_column(column: &Column, pattern: &str, markers: &[String]) -> Option<ParsedColumn> {
    let mut parsed = Vec::with_capacity(column.cells.len());
    let mut any = false;
    for cell in &column.cells {
        let value = match cell {
            CellValue::Null => None,
            CellValue::Text(s) => Some(parse_strict(s, pattern, markers)?),
            CellValue::DateTime(dt) => Some(*dt),
            _ => return None,
        };
        any |= value.is_some();
        parsed.push(value);
    }
    any.then_some(parsed)
}

// ---------------------------------------------------------------------------
// Permissive parsing
// ---------------------------------------------------------------------------

fn parse_cell(cell: &CellValue, candidate: Candidate) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Text(s) => candidate.parse(s.trim()),
        _ => None,
    }
}

/// Pick the candidate format that parses the most cells of `column`.
fn detect_candidate(column: &Column) -> Option<Candidate> {
    let mut best: Option<(Candidate, usize)> = None;
    for &candidate in CANDIDATES {
        let hits = column
            .cells
            .iter()
            .filter(|c| matches!(c, CellValue::Text(_)))
            .filter(|c| parse_cell(c, candidate).is_some())
            .count();
        if hits > 0 && best.map_or(true, |(_, n)| hits > n) {
            best = Some((candidate, hits));
        }
    }
    best.map(|(c, _)| c)
}

/// Retry a cell against the candidates sharing `detected`'s date layout, so
/// a column mixing minute and second precision still parses without
/// switching between month-first and day-first readings.
fn parse_same_layout(s: &str, detected: Candidate) -> Option<NaiveDateTime> {
    let s = s.trim();
    let layout = detected.date_layout();
    CANDIDATES
        .iter()
        .filter(|c| c.date_layout() == layout)
        .find_map(|c| c.parse(s))
}

/// Parse a column with an auto-detected format. Cells the detected format
/// rejects get one more try against candidates with the same date layout.
/// Unreadable cells are `None`. Returns `None` when not a single cell yields
/// a timestamp.
pub fn permissive_column(column: &Column) -> Option<ParsedColumn> {
    let detected = detect_candidate(column);
    let parsed: ParsedColumn = column
        .cells
        .iter()
        .map(|c| match (c, detected) {
            (CellValue::Text(s), Some(candidate)) => {
                candidate
                    .parse(s.trim())
                    .or_else(|| parse_same_layout(s, candidate))
            }
            (CellValue::DateTime(dt), _) => Some(*dt),
            _ => None,
        })
        .collect();
    parsed.iter().any(Option::is_some).then_some(parsed)
}

/// Best-effort parse of a single string against every candidate in order.
pub fn parse_any(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    CANDIDATES.iter().find_map(|c| c.parse(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn col(cells: &[&str]) -> Column {
        Column::new("t", cells.iter().map(|s| CellValue::from_text(s)).collect())
    }

    fn markers() -> Vec<String> {
        vec!["Uhr".to_string(), "h".to_string()]
    }

    fn ymd_hm(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn strips_locale_marker() {
        assert_eq!(strip_trailing_marker("08:00 Uhr", &markers()), "08:00");
        assert_eq!(strip_trailing_marker("08:00h", &markers()), "08:00");
        assert_eq!(strip_trailing_marker(" 08:00 ", &markers()), "08:00");
        assert_eq!(strip_trailing_marker("Uhr", &markers()), "Uhr");
    }

    #[test]
    fn strict_parses_suffixed_german_export() {
        let c = col(&["01.02.2024 08:15 Uhr", "", "01.02.2024 09:45 Uhr"]);
        let parsed = strict_column(&c, "%d.%m.%Y %H:%M", &markers()).unwrap();
        assert_eq!(parsed[0], Some(ymd_hm(2024, 2, 1, 8, 15)));
        assert_eq!(parsed[1], None);
        assert_eq!(parsed[2], Some(ymd_hm(2024, 2, 1, 9, 45)));
    }

    #[test]
    fn strict_rejects_column_on_single_failure() {
        let c = col(&["01.02.2024 08:15 Uhr", "later"]);
        assert!(strict_column(&c, "%d.%m.%Y %H:%M", &markers()).is_none());
    }

    #[test]
    fn strict_requires_a_value() {
        let c = col(&["", " "]);
        assert!(strict_column(&c, "%d.%m.%Y %H:%M", &markers()).is_none());
    }

    #[test]
    fn permissive_accepts_partial_column() {
        let c = col(&["2024-01-01 08:00", "2024-01-01 14:00", "bad"]);
        let parsed = permissive_column(&c).unwrap();
        assert_eq!(parsed[0], Some(ymd_hm(2024, 1, 1, 8, 0)));
        assert_eq!(parsed[1], Some(ymd_hm(2024, 1, 1, 14, 0)));
        assert_eq!(parsed[2], None);
    }

    #[test]
    fn permissive_rejects_plain_numbers_and_words() {
        assert!(permissive_column(&col(&["1", "2.5", "abc"])).is_none());
        assert!(permissive_column(&col(&["", ""])).is_none());
    }

    #[test]
    fn slash_dates_prefer_month_first_unless_impossible() {
        let ambiguous = permissive_column(&col(&["02/03/2024"])).unwrap();
        assert_eq!(ambiguous[0].unwrap().date(), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());

        // 25 cannot be a month, so the day-first reading parses more cells.
        let day_first = permissive_column(&col(&["02/03/2024", "25/03/2024"])).unwrap();
        assert_eq!(day_first[0].unwrap().date(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(day_first[1].unwrap().date(), NaiveDate::from_ymd_opt(2024, 3, 25).unwrap());
    }

    #[test]
    fn one_date_order_per_column() {
        let parsed = permissive_column(&col(&["01/02/2024", "12/25/2024", "13/02/2024"])).unwrap();
        assert_eq!(parsed[0].unwrap().date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(parsed[1].unwrap().date(), NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
        assert_eq!(parsed[2], None);
    }

    #[test]
    fn mixed_precision_in_one_column() {
        let parsed = permissive_column(&col(&[
            "2024-01-01 08:00",
            "2024-01-01 09:00",
            "2024-01-01 12:00:45",
            "2024-01-01T13:00:00+01:00",
        ]))
        .unwrap();
        assert!(parsed.iter().all(Option::is_some));
        assert_eq!(parsed[2].unwrap().second(), 45);
    }

    #[test]
    fn rfc3339_keeps_offset_wall_clock() {
        let parsed = parse_any("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.minute(), 30);
    }

    #[test]
    fn fractional_seconds_and_date_only() {
        let parsed = parse_any("2024-05-01 10:30:15.250").unwrap();
        assert_eq!(parsed.nanosecond(), 250_000_000);
        assert_eq!(parse_any("2024-05-01"), Some(ymd_hm(2024, 5, 1, 0, 0)));
    }
}
