use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ParseConfig;

use super::error::LoadError;
use super::model::{CellValue, Column, FileFormat, SourceInfo, Table};
use super::xlsx;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file on disk.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` / `.txt` – delimited text, delimiter sniffed
/// * `.xlsx` / `.xlsm`        – first worksheet of a workbook
pub fn load_file(path: &Path, cfg: &ParseConfig) -> Result<Table> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let format = format_for(name)?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let table = load_bytes(&bytes, format, cfg)
        .with_context(|| format!("loading {}", path.display()))?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Pick the parser from a filename's extension.
pub fn format_for(file_name: &str) -> Result<FileFormat, LoadError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "tsv" | "txt" => Ok(FileFormat::Delimited),
        "xlsx" | "xlsm" => Ok(FileFormat::Spreadsheet),
        other => Err(LoadError::Format(format!(
            "unsupported file extension '.{other}'; expected .csv or .xlsx"
        ))),
    }
}

/// Parse an uploaded byte stream into a [`Table`].
pub fn load_bytes(bytes: &[u8], format: FileFormat, cfg: &ParseConfig) -> Result<Table, LoadError> {
    match format {
        FileFormat::Delimited => load_delimited(bytes, cfg),
        FileFormat::Spreadsheet => xlsx::load_first_sheet(bytes),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode as UTF-8, falling back to ISO-8859-1.
///
/// Works on the borrowed slice, so the fallback simply re-reads the same bytes.
pub fn decode(bytes: &[u8]) -> Result<(String, &'static str), LoadError> {
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        return Err(LoadError::Encoding("UTF-16 is not supported".into()));
    }
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let (text, encoding) = match std::str::from_utf8(body) {
        Ok(s) => (s.to_string(), "UTF-8"),
        Err(e) => {
            log::warn!("Input is not valid UTF-8 ({e}); retrying as ISO-8859-1");
            let decoded = encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(body)
                .ok_or_else(|| LoadError::Encoding("neither UTF-8 nor ISO-8859-1".into()))?;
            (decoded.into_owned(), "ISO-8859-1")
        }
    };

    if text.contains('\0') {
        return Err(LoadError::Encoding("file looks like binary data".into()));
    }
    Ok((text, encoding))
}

// ---------------------------------------------------------------------------
// Delimiter sniffing
// ---------------------------------------------------------------------------

/// Occurrences of `delim` outside double quotes.
fn count_unquoted(line: &str, delim: char) -> usize {
    let mut in_quotes = false;
    let mut n = 0;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delim && !in_quotes {
            n += 1;
        }
    }
    n
}

/// Pick the column delimiter from the first lines of `text`.
///
/// A candidate qualifies when it occurs on the header line and on every
/// sampled line at least once but never more often than on the header (short
/// rows are allowed, long ones are not). Candidates with the same count on
/// every line rank above ragged ones, then the higher count wins, then the
/// earlier candidate.
///
/// A header line without any candidate is a single-column file and yields
/// `None`, whatever the data lines contain (decimal commas, for instance).
pub fn sniff_delimiter(
    text: &str,
    candidates: &[char],
    max_lines: usize,
) -> Result<Option<u8>, LoadError> {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(max_lines.max(1))
        .collect();
    if lines.is_empty() {
        return Err(LoadError::Format("file is empty".into()));
    }

    let mut best: Option<(u8, (bool, usize))> = None;
    let mut header_has_any = false;
    for &cand in candidates {
        if !cand.is_ascii() {
            log::warn!("Skipping non-ASCII delimiter candidate {cand:?}");
            continue;
        }
        let counts: Vec<usize> = lines.iter().map(|l| count_unquoted(l, cand)).collect();
        let header = counts[0];
        header_has_any |= header > 0;
        if header == 0 || !counts.iter().all(|&n| (1..=header).contains(&n)) {
            continue;
        }
        let rank = (counts.iter().all(|&n| n == header), header);
        log::debug!("Delimiter candidate {cand:?} qualifies with rank {rank:?}");
        if best.map_or(true, |(_, r)| rank > r) {
            best = Some((cand as u8, rank));
        }
    }

    match best {
        Some((delim, _)) => Ok(Some(delim)),
        None if !header_has_any => Ok(None),
        None => Err(LoadError::Format(
            "could not determine the column delimiter".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Trim header names, name blank ones `Unnamed: <i>`, and suffix duplicates
/// with `.1`, `.2`, ...
pub fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for (i, h) in raw.into_iter().enumerate() {
        let base = match h.as_ref().trim() {
            "" => format!("Unnamed: {i}"),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while out.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        out.push(name);
    }
    out
}

/// Whether numeric text in this file uses `,` as the decimal separator.
///
/// Comma-delimited files never do and semicolon exports always do. For any
/// other layout the sampled data rows decide: at least one field like `12,5`
/// and none that look like thousands grouping (`1,234` or `1,234.5`).
/// Three digits after a lone comma are ambiguous and count for neither.
pub fn detect_decimal_comma(text: &str, delimiter: Option<u8>, max_lines: usize) -> bool {
    match delimiter {
        Some(b',') => return false,
        Some(b';') => return true,
        _ => {}
    }

    let mut decimal = 0;
    let mut grouped = 0;
    let fields = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .skip(1)
        .take(max_lines.max(1))
        .flat_map(|line| match delimiter {
            Some(d) => line.split(d as char).collect::<Vec<_>>(),
            None => vec![line],
        });
    for field in fields {
        let field = field
            .trim()
            .trim_matches('"')
            .trim_start_matches(|c: char| c == '-' || c == '+');
        let Some((int, frac)) = field.split_once(',') else {
            continue;
        };
        if int.is_empty() || !int.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if frac.contains(',') || frac.contains('.') {
            grouped += 1;
        } else if frac.len() != 3 && !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit())
        {
            decimal += 1;
        }
    }
    log::debug!("Decimal comma evidence: {decimal} decimal, {grouped} grouped");
    decimal > 0 && grouped == 0
}

fn load_delimited(bytes: &[u8], cfg: &ParseConfig) -> Result<Table, LoadError> {
    let (text, encoding) = decode(bytes)?;
    let delimiter = sniff_delimiter(&text, &cfg.delimiters, cfg.sniff_lines)?;
    let decimal_comma = detect_decimal_comma(&text, delimiter, cfg.sniff_lines);
    log::debug!(
        "Using delimiter {:?} ({encoding}, decimal comma: {decimal_comma})",
        delimiter.map(char::from)
    );

    // Decoded text never contains NUL, so a single-column file is never split.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.unwrap_or(b'\0'))
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LoadError::Format(format!("reading header row: {e}")))?;
    if headers.is_empty() {
        return Err(LoadError::Format("missing header row".into()));
    }
    let names = normalize_headers(headers.iter());

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::Format(format!("row {}: {e}", row_no + 1)))?;
        if record.len() > names.len() {
            log::debug!(
                "Row {}: dropping {} extra fields",
                row_no + 1,
                record.len() - names.len()
            );
        }
        for (col_idx, col_cells) in cells.iter_mut().enumerate() {
            let value = record
                .get(col_idx)
                .map(CellValue::from_text)
                .unwrap_or(CellValue::Null);
            col_cells.push(value);
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();

    Ok(Table::new(
        columns,
        SourceInfo {
            format: FileFormat::Delimited,
            delimiter,
            encoding,
            decimal_comma,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(bytes: &[u8]) -> Result<Table, LoadError> {
        load_bytes(bytes, FileFormat::Delimited, &ParseConfig::default())
    }

    fn cell(table: &Table, col: &str, row: usize) -> CellValue {
        table.column(col).unwrap().cells[row].clone()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(format_for("data.CSV").unwrap(), FileFormat::Delimited);
        assert_eq!(format_for("book.xlsx").unwrap(), FileFormat::Spreadsheet);
        assert!(matches!(format_for("notes.pdf"), Err(LoadError::Format(_))));
    }

    #[test]
    fn comma_file_with_trimmed_headers() {
        let table = load(b" time , value \n2024-01-01 08:00,5\n2024-01-01 14:00,9\n").unwrap();
        assert_eq!(table.column_names(), vec!["time", "value"]);
        assert_eq!(table.len(), 2);
        assert_eq!(cell(&table, "value", 1), CellValue::Text("9".into()));
        assert_eq!(table.source.delimiter, Some(b','));
        assert!(!table.source.decimal_comma);
    }

    #[test]
    fn semicolon_export_with_decimal_commas() {
        let table = load(b"Zeit;Temp\n01.02.2024 08:00;12,5\n01.02.2024 09:00;13,0\n").unwrap();
        assert_eq!(table.source.delimiter, Some(b';'));
        assert!(table.source.decimal_comma);
        assert_eq!(cell(&table, "Temp", 0), CellValue::Text("12,5".into()));
    }

    #[test]
    fn tab_delimited() {
        let table = load(b"a\tb\n1\t2\n").unwrap();
        assert_eq!(table.source.delimiter, Some(b'\t'));
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn latin1_fallback() {
        // "Temperatur °C" with ° encoded as 0xB0.
        let bytes = b"Zeit;Temperatur \xb0C\n2024-01-01 08:00;4\n";
        let table = load(bytes).unwrap();
        assert_eq!(table.source.encoding, "ISO-8859-1");
        assert_eq!(table.column_names()[1], "Temperatur °C");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let table = load(b"\xEF\xBB\xBFa,b\n1,2\n").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn utf16_is_rejected() {
        assert!(matches!(load(b"\xFF\xFEa\0,\0b\0"), Err(LoadError::Encoding(_))));
    }

    #[test]
    fn inconsistent_delimiters_fail_sniffing() {
        let err = sniff_delimiter("a,b;c\nd;e;f,g,h\n", &[',', ';'], 20).unwrap_err();
        assert!(matches!(err, LoadError::Format(_)));
    }

    #[test]
    fn quoted_delimiters_are_ignored() {
        let d = sniff_delimiter("name;note\nx;\"a;b\"\n", &[',', ';'], 20).unwrap();
        assert_eq!(d, Some(b';'));
    }

    #[test]
    fn single_column_file() {
        let table = load(b"value\n1\n2\n").unwrap();
        assert_eq!(table.column_names(), vec!["value"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.source.delimiter, None);
    }

    #[test]
    fn single_column_with_decimal_commas() {
        let table = load(b"value\n1,5\n2,5\n").unwrap();
        assert_eq!(table.column_names(), vec!["value"]);
        assert_eq!(table.len(), 2);
        assert_eq!(cell(&table, "value", 0), CellValue::Text("1,5".into()));
        assert!(table.source.decimal_comma);
    }

    #[test]
    fn tab_export_with_thousands_separators() {
        let table = load(b"id\tamount\n1\t1,234\n2\t12,345.5\n").unwrap();
        assert_eq!(table.source.delimiter, Some(b'\t'));
        assert!(!table.source.decimal_comma);

        let german = load(b"id\tamount\n1\t12,5\n2\t3,75\n").unwrap();
        assert!(german.source.decimal_comma);
    }

    #[test]
    fn ambiguous_comma_groups_do_not_enable_decimal_commas() {
        assert!(!detect_decimal_comma("v\n1,250\n", None, 20));
        assert!(detect_decimal_comma("v\n1,250\n2,5\n", None, 20));
        assert!(detect_decimal_comma("a;b\n1;2\n", Some(b';'), 20));
        assert!(!detect_decimal_comma("a,b\n\"1,5\",2\n", Some(b','), 20));
    }

    #[test]
    fn blank_and_duplicate_headers() {
        assert_eq!(
            normalize_headers(["a", "", "a", "a"]),
            vec!["a", "Unnamed: 1", "a.1", "a.2"]
        );
    }

    #[test]
    fn ragged_rows_are_padded() {
        let table = load(b"a,b,c\n1,2,3\n4,5\n").unwrap();
        assert_eq!(cell(&table, "c", 1), CellValue::Null);
        assert_eq!(cell(&table, "b", 1), CellValue::Text("5".into()));
    }

    #[test]
    fn empty_input_is_a_format_error() {
        assert!(matches!(load(b""), Err(LoadError::Format(_))));
        assert!(matches!(load(b"\n\n"), Err(LoadError::Format(_))));
    }

    #[test]
    fn header_only_loads_empty_table() {
        let table = load(b"a,b\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }
}
