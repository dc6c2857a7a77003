use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as it comes out of a loader.
///
/// Delimited text only ever produces `Text` and `Null`; spreadsheets carry
/// their native types through.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Wall-clock timestamp without a zone.
    DateTime(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Build a cell from raw delimited text: blank means missing.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Nominal type of a column, as shown in the type summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Empty,
    Text,
    Integer,
    Float,
    Bool,
    DateTime,
    Mixed,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Empty => "empty",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::DateTime => "datetime",
            ColumnType::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Summarise the cell types. Integers mixed with floats count as float.
    pub fn dtype(&self) -> ColumnType {
        let mut seen: Option<ColumnType> = None;
        for cell in &self.cells {
            let kind = match cell {
                CellValue::Null => continue,
                CellValue::Text(_) => ColumnType::Text,
                CellValue::Integer(_) => ColumnType::Integer,
                CellValue::Float(_) => ColumnType::Float,
                CellValue::Bool(_) => ColumnType::Bool,
                CellValue::DateTime(_) => ColumnType::DateTime,
            };
            seen = Some(match (seen, kind) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Mixed,
            });
        }
        seen.unwrap_or(ColumnType::Empty)
    }

    pub fn non_null(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.iter().filter(|c| !c.is_null())
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileFormat {
    Delimited,
    Spreadsheet,
}

/// Where a table came from and how it was decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub format: FileFormat,
    /// Sniffed delimiter (delimited text only).
    pub delimiter: Option<u8>,
    /// Name of the encoding the bytes were decoded with.
    pub encoding: &'static str,
    /// Numeric text may use `,` as the decimal separator.
    pub decimal_comma: bool,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            format: FileFormat::Delimited,
            delimiter: Some(b','),
            encoding: "UTF-8",
            decimal_comma: false,
        }
    }
}

/// An ordered set of equally long, named columns.
///
/// Every row remembers its position in the file it was loaded from, so
/// derived tables (filtered, previewed) still know where their rows came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
    /// Source row number of each row.
    row_index: Vec<usize>,
    pub source: SourceInfo,
}

impl Table {
    /// Build a table, padding short columns with `Null` so every column has
    /// the length of the longest one.
    pub fn new(mut columns: Vec<Column>, source: SourceInfo) -> Self {
        let n_rows = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for col in &mut columns {
            col.cells.resize(n_rows, CellValue::Null);
        }
        Self {
            columns,
            n_rows,
            row_index: (0..n_rows).collect(),
            source,
        }
    }

    /// Same rows and source, different columns. Columns are padded or cut
    /// to the current row count.
    pub fn with_columns(&self, mut columns: Vec<Column>) -> Self {
        for col in &mut columns {
            col.cells.resize(self.n_rows, CellValue::Null);
        }
        Self {
            columns,
            n_rows: self.n_rows,
            row_index: self.row_index.clone(),
            source: self.source.clone(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Source row number of each row, in table order.
    pub fn row_index(&self) -> &[usize] {
        &self.row_index
    }

    /// Copy of the table keeping only the given rows, in the given order.
    /// Out-of-range positions are skipped.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let rows: Vec<usize> = rows.iter().copied().filter(|&r| r < self.n_rows).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let cells = rows
                    .iter()
                    .filter_map(|&r| c.cells.get(r).cloned())
                    .collect();
                Column::new(c.name.clone(), cells)
            })
            .collect::<Vec<_>>();
        Self {
            n_rows: rows.len(),
            row_index: rows.iter().map(|&r| self.row_index[r]).collect(),
            columns,
            source: self.source.clone(),
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let rows: Vec<usize> = (0..self.n_rows.min(n)).collect();
        self.select_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from_text(s)
    }

    #[test]
    fn blank_text_is_null() {
        assert_eq!(text("   "), CellValue::Null);
        assert_eq!(text(""), CellValue::Null);
        assert_eq!(text(" a "), CellValue::Text(" a ".into()));
    }

    #[test]
    fn dtype_summary() {
        let ints = Column::new("a", vec![CellValue::Integer(1), CellValue::Null]);
        assert_eq!(ints.dtype(), ColumnType::Integer);

        let num = Column::new("b", vec![CellValue::Integer(1), CellValue::Float(2.5)]);
        assert_eq!(num.dtype(), ColumnType::Float);

        let mixed = Column::new("c", vec![CellValue::Integer(1), text("x")]);
        assert_eq!(mixed.dtype(), ColumnType::Mixed);

        let empty = Column::new("d", vec![CellValue::Null, CellValue::Null]);
        assert_eq!(empty.dtype(), ColumnType::Empty);
    }

    #[test]
    fn new_pads_short_columns() {
        let table = Table::new(
            vec![
                Column::new("a", vec![text("1"), text("2")]),
                Column::new("b", vec![text("x")]),
            ],
            SourceInfo::default(),
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("b").unwrap().cells[1], CellValue::Null);
    }

    #[test]
    fn select_rows_keeps_order_and_original() {
        let table = Table::new(
            vec![Column::new("a", vec![text("1"), text("2"), text("3")])],
            SourceInfo::default(),
        );
        let picked = table.select_rows(&[0, 2]);
        assert_eq!(picked.len(), 2);
        assert_eq!(
            picked.column("a").unwrap().cells,
            vec![text("1"), text("3")]
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.head(1).len(), 1);
        assert_eq!(table.head(10).len(), 3);
    }

    #[test]
    fn derived_tables_keep_source_row_numbers() {
        let table = Table::new(
            vec![Column::new("a", vec![text("1"), text("2"), text("3"), text("4")])],
            SourceInfo::default(),
        );
        assert_eq!(table.row_index(), &[0, 1, 2, 3]);

        let picked = table.select_rows(&[1, 3, 9]);
        assert_eq!(picked.row_index(), &[1, 3]);
        assert_eq!(picked.select_rows(&[1]).row_index(), &[3]);

        let swapped = picked.with_columns(vec![Column::new("b", vec![text("x")])]);
        assert_eq!(swapped.row_index(), &[1, 3]);
        assert_eq!(swapped.column("b").unwrap().cells, vec![text("x"), CellValue::Null]);
    }
}
