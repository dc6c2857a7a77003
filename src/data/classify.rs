use std::fmt;

use serde::Serialize;

use crate::config::ParseConfig;

use super::error::ClassificationError;
use super::model::{CellValue, Column, Table};
use super::numeric;
use super::timestamp::{self, ParsedColumn};

// ---------------------------------------------------------------------------
// Classification types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnClass {
    Temporal,
    Numeric,
    Unclassified,
}

impl fmt::Display for ColumnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnClass::Temporal => f.write_str("time"),
            ColumnClass::Numeric => f.write_str("numeric"),
            ColumnClass::Unclassified => f.write_str("other"),
        }
    }
}

/// How a temporal column was recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalSource {
    /// Cells were already timestamps.
    Native,
    /// Every cell matched this fixed pattern.
    Strict(String),
    /// Format auto-detected; some cells may have failed.
    Permissive,
}

/// Column name → class, in table column order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Classification {
    columns: Vec<(String, ColumnClass)>,
}

impl Classification {
    pub fn class_of(&self, name: &str) -> Option<ColumnClass> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnClass)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), *c))
    }

    fn names_with(&self, class: ColumnClass) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, c)| *c == class)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Names of `Temporal` columns, in table order.
    pub fn temporal(&self) -> Vec<String> {
        self.names_with(ColumnClass::Temporal)
    }

    /// Names of `Numeric` columns, in table order.
    pub fn numeric(&self) -> Vec<String> {
        self.names_with(ColumnClass::Numeric)
    }
}

// ---------------------------------------------------------------------------
// Per-column inference
// ---------------------------------------------------------------------------

/// Try the temporal strategies in order; the first one that succeeds wins.
pub fn detect_temporal(column: &Column, cfg: &ParseConfig) -> Option<(TemporalSource, ParsedColumn)> {
    let mut present = column.non_null().peekable();
    present.peek()?;
    if present.all(|c| matches!(c, CellValue::DateTime(_))) {
        let parsed = column
            .cells
            .iter()
            .map(|c| match c {
                CellValue::DateTime(dt) => Some(*dt),
                _ => None,
            })
            .collect();
        return Some((TemporalSource::Native, parsed));
    }

    for pattern in &cfg.strict_formats {
        if let Some(parsed) = timestamp::strict_column(column, pattern, &cfg.trailing_markers) {
            return Some((TemporalSource::Strict(pattern.clone()), parsed));
        }
    }

    timestamp::permissive_column(column).map(|parsed| (TemporalSource::Permissive, parsed))
}

/// Whether at least one cell coerces to a finite number.
pub fn is_numeric(column: &Column, decimal_comma: bool) -> bool {
    column
        .cells
        .iter()
        .any(|c| numeric::coerce(c, decimal_comma).is_some())
}

fn normalized(column: &Column, parsed: ParsedColumn) -> Column {
    let cells = parsed
        .into_iter()
        .map(|v| v.map(CellValue::DateTime).unwrap_or(CellValue::Null))
        .collect();
    Column::new(column.name.clone(), cells)
}

/// Classify every column and build a copy of the table whose temporal
/// columns hold parsed timestamps. The input is not modified.
pub fn classify(table: &Table, cfg: &ParseConfig) -> (Classification, Table) {
    let mut classes = Vec::with_capacity(table.columns().len());
    let mut columns = Vec::with_capacity(table.columns().len());

    for column in table.columns() {
        let (class, col) = match detect_temporal(column, cfg) {
            Some((source, parsed)) => {
                log::debug!("Column '{}': temporal ({source:?})", column.name);
                (ColumnClass::Temporal, normalized(column, parsed))
            }
            None if is_numeric(column, table.source.decimal_comma) => {
                log::debug!("Column '{}': numeric", column.name);
                (ColumnClass::Numeric, column.clone())
            }
            None => {
                log::debug!("Column '{}': unclassified", column.name);
                (ColumnClass::Unclassified, column.clone())
            }
        };
        classes.push((column.name.clone(), class));
        columns.push(col);
    }

    (Classification { columns: classes }, table.with_columns(columns))
}

// ---------------------------------------------------------------------------
// ClassifiedTable
// ---------------------------------------------------------------------------

/// A table ready for plotting: its classification plus normalized cells.
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    pub classification: Classification,
    /// Copy of the loaded table with temporal columns parsed.
    pub table: Table,
}

impl ClassifiedTable {
    /// Whether any column can serve as a time axis. Without one, plots use
    /// the row index.
    pub fn has_time_axis(&self) -> bool {
        self.classification
            .iter()
            .any(|(_, c)| c == ColumnClass::Temporal)
    }
}

/// Classify a table for plotting. Fails when there is nothing to plot.
pub fn classify_table(table: &Table, cfg: &ParseConfig) -> Result<ClassifiedTable, ClassificationError> {
    let (classification, normalized) = classify(table, cfg);
    if classification.numeric().is_empty() {
        return Err(ClassificationError::NoMeasurements);
    }
    Ok(ClassifiedTable {
        classification,
        table: normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::SourceInfo;

    fn text_col(name: &str, cells: &[&str]) -> Column {
        Column::new(name, cells.iter().map(|s| CellValue::from_text(s)).collect())
    }

    fn table(columns: Vec<Column>) -> Table {
        Table::new(columns, SourceInfo::default())
    }

    #[test]
    fn scenario_timestamp_and_measurement() {
        let t = table(vec![
            text_col("time", &["2024-01-01 08:00", "2024-01-01 14:00", "bad"]),
            text_col("value", &["5", "9", "3"]),
        ]);
        let (classes, normalized) = classify(&t, &ParseConfig::default());
        assert_eq!(classes.class_of("time"), Some(ColumnClass::Temporal));
        assert_eq!(classes.class_of("value"), Some(ColumnClass::Numeric));

        let time = &normalized.column("time").unwrap().cells;
        assert!(matches!(time[0], CellValue::DateTime(_)));
        assert_eq!(time[2], CellValue::Null);
        // Original untouched.
        assert_eq!(t.column("time").unwrap().cells[2], CellValue::Text("bad".into()));
    }

    #[test]
    fn classification_is_deterministic() {
        let t = table(vec![
            text_col("a", &["2024-03-01T10:00:00", "x"]),
            text_col("b", &["1", "oops"]),
            text_col("c", &["", ""]),
        ]);
        let cfg = ParseConfig::default();
        assert_eq!(classify(&t, &cfg), classify(&t, &cfg));
    }

    #[test]
    fn iso_column_is_temporal() {
        let t = table(vec![text_col(
            "ts",
            &["2024-03-01T10:00:00", "2024-03-01T10:00:01", "2024-03-01T10:00:02"],
        )]);
        let (classes, _) = classify(&t, &ParseConfig::default());
        assert_eq!(classes.temporal(), vec!["ts"]);
    }

    #[test]
    fn strict_pattern_takes_precedence() {
        let c = text_col("Zeit", &["01.02.2024 08:00 Uhr", "01.02.2024 09:00 Uhr"]);
        let (source, parsed) = detect_temporal(&c, &ParseConfig::default()).unwrap();
        assert_eq!(source, TemporalSource::Strict("%d.%m.%Y %H:%M".into()));
        assert!(parsed.iter().all(Option::is_some));
    }

    #[test]
    fn native_timestamps_are_not_reparsed() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let c = Column::new("t", vec![CellValue::DateTime(dt), CellValue::Null]);
        let (source, parsed) = detect_temporal(&c, &ParseConfig::default()).unwrap();
        assert_eq!(source, TemporalSource::Native);
        assert_eq!(parsed, vec![Some(dt), None]);
    }

    #[test]
    fn dirty_numeric_column_is_numeric() {
        let t = table(vec![text_col("power", &["n/a", "12.5", "5 kW", ""])]);
        let (classes, _) = classify(&t, &ParseConfig::default());
        assert_eq!(classes.numeric(), vec!["power"]);
    }

    #[test]
    fn blank_and_text_columns_are_unclassified() {
        let t = table(vec![
            text_col("blank", &["", " "]),
            text_col("label", &["north", "south"]),
            text_col("value", &["1", "2"]),
        ]);
        let (classes, _) = classify(&t, &ParseConfig::default());
        assert_eq!(classes.class_of("blank"), Some(ColumnClass::Unclassified));
        assert_eq!(classes.class_of("label"), Some(ColumnClass::Unclassified));
    }

    #[test]
    fn temporal_is_never_numeric() {
        // One timestamp among numbers: permissive temporal wins.
        let t = table(vec![text_col("mixed", &["1", "2", "2024-01-01 00:00"])]);
        let (classes, _) = classify(&t, &ParseConfig::default());
        assert_eq!(classes.class_of("mixed"), Some(ColumnClass::Temporal));
        assert!(classes.numeric().is_empty());
    }

    #[test]
    fn no_numeric_columns_is_fatal() {
        let t = table(vec![
            text_col("time", &["2024-01-01 08:00"]),
            text_col("blank", &[""]),
        ]);
        let err = classify_table(&t, &ParseConfig::default()).unwrap_err();
        assert_eq!(err, ClassificationError::NoMeasurements);
    }

    #[test]
    fn missing_time_axis_is_reported_not_fatal() {
        let t = table(vec![text_col("value", &["1", "2"])]);
        let classified = classify_table(&t, &ParseConfig::default()).unwrap();
        assert!(!classified.has_time_axis());
    }
}
