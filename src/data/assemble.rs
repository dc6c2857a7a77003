use chrono::NaiveDateTime;
use serde::Serialize;

use super::classify::{Classification, ColumnClass};
use super::error::AssemblyError;
use super::model::Table;
use super::numeric;
use super::timestamp;

// ---------------------------------------------------------------------------
// PlotRequest – what the renderer receives
// ---------------------------------------------------------------------------

/// An x position: a timestamp, or the row's number in the loaded file (kept
/// across filtering).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Time(NaiveDateTime),
    Index(usize),
}

impl AxisValue {
    /// Position on a numeric plot axis; timestamps become seconds since the
    /// Unix epoch.
    pub fn as_f64(&self) -> f64 {
        match self {
            AxisValue::Time(dt) => dt.and_utc().timestamp_millis() as f64 / 1000.0,
            AxisValue::Index(i) => *i as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRow {
    pub x: AxisValue,
    /// One value per entry of [`PlotRequest::y_columns`].
    pub y: Vec<f64>,
}

/// Clean, row-aligned data for exactly the selected columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRequest {
    pub x_column: Option<String>,
    pub y_columns: Vec<String>,
    pub rows: Vec<PlotRow>,
}

impl PlotRequest {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `[x, y]` points of the `series`-th y column.
    pub fn points(&self, series: usize) -> Vec<[f64; 2]> {
        self.rows
            .iter()
            .filter_map(|r| r.y.get(series).map(|&y| [r.x.as_f64(), y]))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

fn require_class(
    table: &Table,
    classification: &Classification,
    name: &str,
    class: ColumnClass,
) -> Result<(), AssemblyError> {
    if table.column(name).is_none() {
        return Err(AssemblyError::UnknownColumn(name.to_string()));
    }
    match classification.class_of(name) {
        Some(c) if c == class => Ok(()),
        _ if class == ColumnClass::Temporal => Err(AssemblyError::NotTemporal(name.to_string())),
        _ => Err(AssemblyError::NotNumeric(name.to_string())),
    }
}

/// Build the plot data for `y_columns` against `x_column` (or the row index).
///
/// A row survives only if its x value and every selected y value are valid.
/// The input table is left untouched.
pub fn assemble(
    table: &Table,
    classification: &Classification,
    x_column: Option<&str>,
    y_columns: &[String],
) -> Result<PlotRequest, AssemblyError> {
    if y_columns.is_empty() {
        return Err(AssemblyError::NoSeriesSelected);
    }
    for y in y_columns {
        require_class(table, classification, y, ColumnClass::Numeric)?;
    }

    let xs: Vec<Option<AxisValue>> = match x_column {
        Some(name) => {
            require_class(table, classification, name, ColumnClass::Temporal)?;
            let column = table
                .column(name)
                .ok_or_else(|| AssemblyError::UnknownColumn(name.to_string()))?;
            match timestamp::permissive_column(column) {
                Some(parsed) => parsed.into_iter().map(|v| v.map(AxisValue::Time)).collect(),
                None => vec![None; table.len()],
            }
        }
        None => table
            .row_index()
            .iter()
            .map(|&i| Some(AxisValue::Index(i)))
            .collect(),
    };

    let ys: Vec<Vec<Option<f64>>> = y_columns
        .iter()
        .filter_map(|name| table.column(name))
        .map(|c| numeric::coerce_column(c, table.source.decimal_comma))
        .collect();

    let rows: Vec<PlotRow> = xs
        .into_iter()
        .enumerate()
        .filter_map(|(row, x)| {
            let x = x?;
            let y = ys.iter().map(|col| col[row]).collect::<Option<Vec<f64>>>()?;
            Some(PlotRow { x, y })
        })
        .collect();

    log::debug!(
        "Assembled {} of {} rows for {:?} vs {:?}",
        rows.len(),
        table.len(),
        y_columns,
        x_column
    );

    if rows.is_empty() {
        return Err(AssemblyError::EmptyAfterClean);
    }
    Ok(PlotRequest {
        x_column: x_column.map(str::to_string),
        y_columns: y_columns.to_vec(),
        rows,
    })
}
