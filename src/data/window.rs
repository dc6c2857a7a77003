use std::collections::BTreeSet;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use super::error::FilterError;
use super::model::Table;
use super::timestamp::{self, ParsedColumn};

// ---------------------------------------------------------------------------
// TimeWindow
// ---------------------------------------------------------------------------

/// A wall-clock window within one day, at minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

fn to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

impl TimeWindow {
    /// Bounds are truncated to the minute; `start` must be before `end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, FilterError> {
        let (start, end) = (to_minute(start), to_minute(end));
        if start >= end {
            return Err(FilterError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    /// Window from `hour:minute` pairs. Out-of-range values are invalid.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Result<Self, FilterError> {
        let start = NaiveTime::from_hms_opt(start.0, start.1, 0).ok_or(FilterError::InvalidWindow)?;
        let end = NaiveTime::from_hms_opt(end.0, end.1, 0).ok_or(FilterError::InvalidWindow)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether the minute of `t` lies in `[start, end]`.
    pub fn contains(&self, t: NaiveTime) -> bool {
        let t = to_minute(t);
        self.start <= t && t <= self.end
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// One flag per row; `true` keeps the row.
pub type FilterMask = Vec<bool>;

/// Parse `column` permissively, rejecting it if nothing parses.
fn timestamps_of(table: &Table, column: &str) -> Result<ParsedColumn, FilterError> {
    let col = table
        .column(column)
        .ok_or_else(|| FilterError::UnknownColumn(column.to_string()))?;
    timestamp::permissive_column(col).ok_or_else(|| {
        log::warn!("Column '{column}' has no readable timestamps");
        FilterError::UnparseableColumn(column.to_string())
    })
}

/// Rows of `table` whose timestamp in `column` falls inside `window`.
/// Rows with a missing or unreadable timestamp are excluded.
pub fn filter_mask(table: &Table, column: &str, window: &TimeWindow) -> Result<FilterMask, FilterError> {
    let parsed = timestamps_of(table, column)?;
    Ok(parsed
        .iter()
        .map(|v| v.is_some_and(|dt| window.contains(dt.time())))
        .collect())
}

/// Derived table with only the rows the mask keeps, order preserved.
pub fn apply_mask(table: &Table, mask: &[bool]) -> Table {
    let rows: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter(|(_, keep)| **keep)
        .map(|(i, _)| i)
        .collect();
    table.select_rows(&rows)
}

// ---------------------------------------------------------------------------
// Highlight
// ---------------------------------------------------------------------------

/// The window placed on one calendar date of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// One interval per distinct date in `column`, in ascending date order.
pub fn highlight_intervals(
    table: &Table,
    column: &str,
    window: &TimeWindow,
) -> Result<Vec<HighlightInterval>, FilterError> {
    let parsed = timestamps_of(table, column)?;
    let dates: BTreeSet<_> = parsed.iter().flatten().map(|dt| dt.date()).collect();
    Ok(dates
        .into_iter()
        .map(|d| HighlightInterval {
            start: d.and_time(window.start),
            end: d.and_time(window.end),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column, SourceInfo};

    fn table(times: &[&str]) -> Table {
        let values = (0..times.len()).map(|i| CellValue::Integer(i as i64)).collect();
        Table::new(
            vec![
                Column::new("time", times.iter().map(|s| CellValue::from_text(s)).collect()),
                Column::new("value", values),
            ],
            SourceInfo::default(),
        )
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn reversed_or_empty_window_is_rejected() {
        assert_eq!(TimeWindow::new(hm(10, 0), hm(9, 0)), Err(FilterError::InvalidWindow));
        assert_eq!(TimeWindow::new(hm(9, 0), hm(9, 0)), Err(FilterError::InvalidWindow));
        assert_eq!(TimeWindow::from_hm((25, 0), (26, 0)), Err(FilterError::InvalidWindow));
    }

    #[test]
    fn scenario_morning_window() {
        let t = table(&["2024-01-01 08:00", "2024-01-01 14:00"]);
        let w = TimeWindow::from_hm((8, 0), (12, 0)).unwrap();
        assert_eq!(filter_mask(&t, "time", &w).unwrap(), vec![true, false]);
    }

    #[test]
    fn bounds_are_inclusive() {
        let t = table(&["2024-01-01 07:59", "2024-01-01 08:00", "2024-01-01 12:00:45", "2024-01-01 12:01"]);
        let w = TimeWindow::from_hm((8, 0), (12, 0)).unwrap();
        assert_eq!(filter_mask(&t, "time", &w).unwrap(), vec![false, true, true, false]);
    }

    #[test]
    fn full_day_window_keeps_everything() {
        let t = table(&["2024-01-01 00:00", "2024-01-01 12:00", "2024-01-02 23:59:59"]);
        let w = TimeWindow::from_hm((0, 0), (23, 59)).unwrap();
        let mask = filter_mask(&t, "time", &w).unwrap();
        assert_eq!(mask.len(), t.len());
        assert!(mask.iter().all(|&m| m));
    }

    #[test]
    fn unreadable_rows_are_excluded_and_order_kept() {
        let t = table(&["2024-01-01 09:00", "bad", "2024-01-01 10:00", "2024-01-01 20:00"]);
        let w = TimeWindow::from_hm((8, 0), (12, 0)).unwrap();
        let mask = filter_mask(&t, "time", &w).unwrap();
        assert_eq!(mask, vec![true, false, true, false]);

        let filtered = apply_mask(&t, &mask);
        assert_eq!(
            filtered.column("value").unwrap().cells,
            vec![CellValue::Integer(0), CellValue::Integer(2)]
        );
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn unparseable_column_is_rejected() {
        let t = table(&["2024-01-01 09:00"]);
        let w = TimeWindow::from_hm((8, 0), (12, 0)).unwrap();
        assert_eq!(
            filter_mask(&t, "value", &w),
            Err(FilterError::UnparseableColumn("value".into()))
        );
        assert_eq!(
            highlight_intervals(&t, "nope", &w),
            Err(FilterError::UnknownColumn("nope".into()))
        );
    }

    #[test]
    fn one_highlight_per_date() {
        let t = table(&[
            "2024-01-02 09:00",
            "2024-01-01 08:00",
            "2024-01-01 14:00",
            "",
        ]);
        let w = TimeWindow::from_hm((8, 30), (12, 0)).unwrap();
        let intervals = highlight_intervals(&t, "time", &w).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start.to_string(), "2024-01-01 08:30:00");
        assert_eq!(intervals[0].end.to_string(), "2024-01-01 12:00:00");
        assert_eq!(intervals[1].start.date().to_string(), "2024-01-02");
    }
}
