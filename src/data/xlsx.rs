//! First-worksheet reader for `.xlsx` workbooks.
//!
//! A workbook is a zip archive of XML parts. Only what a table needs is read:
//! the sheet list and its relationships (to find the first sheet), shared
//! strings, and the cell styles (to tell date-formatted numbers from plain
//! ones).

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Seek};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use super::error::LoadError;
use super::loader::normalize_headers;
use super::model::{CellValue, Column, FileFormat, SourceInfo, Table};

/// Read the first worksheet of a workbook. The first populated row holds the
/// headers.
pub fn load_first_sheet(bytes: &[u8]) -> Result<Table, LoadError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| LoadError::Format(format!("not a valid .xlsx archive: {e}")))?;

    let workbook = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| LoadError::Format("workbook has no xl/workbook.xml".into()))?;
    let (sheets, dates) = parse_workbook(&workbook)?;
    let first = sheets
        .first()
        .ok_or_else(|| LoadError::Format("workbook contains no sheets".into()))?;
    if sheets.len() > 1 {
        log::info!(
            "Workbook has {} sheets; reading only '{}'",
            sheets.len(),
            first.name
        );
    }

    let relationships = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    let target = sheet_target(first, &relationships);

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let date_styles = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_date_styles(&xml)?,
        None => Vec::new(),
    };

    let sheet = read_part(&mut archive, &target)?
        .ok_or_else(|| LoadError::Format(format!("sheet part {target} is missing")))?;
    let context = CellContext {
        shared: &shared,
        date_styles: &date_styles,
        dates,
    };
    let cells = parse_sheet(&sheet, &context)?;
    Ok(build_table(cells))
}

// ---------------------------------------------------------------------------
// Archive parts
// ---------------------------------------------------------------------------

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, LoadError> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(LoadError::Format(format!("reading {name}: {e}"))),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

struct SheetEntry {
    name: String,
    rel_id: Option<String>,
}

/// Sheets in workbook order, plus the workbook's date system.
fn parse_workbook(xml: &[u8]) -> Result<(Vec<SheetEntry>, DateSystem), LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut dates = DateSystem::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"workbookPr" => {
                if matches!(attr(&e, b"date1904")?.as_deref(), Some("1" | "true")) {
                    dates = DateSystem::Excel1904;
                }
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"sheet" => {
                if let Some(name) = attr(&e, b"name")? {
                    sheets.push(SheetEntry {
                        name,
                        rel_id: attr(&e, b"r:id")?,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok((sheets, dates))
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(map)
}

fn sheet_target(sheet: &SheetEntry, relationships: &HashMap<String, String>) -> String {
    let target = sheet
        .rel_id
        .as_ref()
        .and_then(|id| relationships.get(id))
        .cloned()
        .unwrap_or_else(|| "worksheets/sheet1.xml".to_string());
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_string()
    } else {
        format!("xl/{trimmed}")
    }
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"si" => {
                current.clear();
                in_si = true;
            }
            // Rich text runs (<r><t>..</t></r>) are concatenated.
            Ok(Event::Start(e)) if e.name().as_ref() == b"t" && in_si => {
                let raw = reader.read_text(e.name()).map_err(xml_err)?;
                current.push_str(&unescape(&raw)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
                in_si = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

// ---------------------------------------------------------------------------
// Date styles
// ---------------------------------------------------------------------------

/// Whether a number format id or custom format code renders a date or time.
fn is_date_format(id: u32, custom: &HashMap<u32, String>) -> bool {
    match id {
        14..=22 | 27..=36 | 45..=47 | 50..=58 => true,
        _ => custom.get(&id).is_some_and(|code| format_code_is_date(code)),
    }
}

fn format_code_is_date(code: &str) -> bool {
    let mut plain = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for ch in code.chars() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            _ if !in_quotes && !in_brackets => plain.push(ch.to_ascii_lowercase()),
            _ => {}
        }
    }
    plain.contains(['y', 'm', 'd', 'h', 's'])
}

/// One flag per entry of `<cellXfs>`: does that style format dates?
fn parse_date_styles(xml: &[u8]) -> Result<Vec<bool>, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_formats: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"numFmt" => {
                let id = attr(&e, b"numFmtId")?.and_then(|v| v.parse::<u32>().ok());
                if let (Some(id), Some(code)) = (id, attr(&e, b"formatCode")?) {
                    custom.insert(id, code);
                }
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if in_cell_xfs && e.name().as_ref() == b"xf" =>
            {
                let id = attr(&e, b"numFmtId")?
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0);
                xf_formats.push(id);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_formats
        .into_iter()
        .map(|id| is_date_format(id, &custom))
        .collect())
}

/// Epoch a workbook counts its serial dates from (`workbookPr/@date1904`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSystem {
    /// Serial 1 is 1900-01-01. Excel also counts a 1900-02-29 (serial 60)
    /// that never existed.
    #[default]
    Excel1900,
    /// Serial 0 is 1904-01-01.
    Excel1904,
}

impl DateSystem {
    /// Timestamp for a serial day number; the fraction is the time of day.
    ///
    /// In the 1900 system serials before the phantom leap day count from
    /// 1899-12-31 and later ones from 1899-12-30; the phantom day itself has
    /// no timestamp. Serials below 1 are times without a date and land on
    /// 1899-12-30.
    pub fn to_datetime(self, serial: f64) -> Option<NaiveDateTime> {
        let epoch = match self {
            DateSystem::Excel1900 if !(0.0..2_958_466.0).contains(&serial) => return None,
            DateSystem::Excel1900 if (60.0..61.0).contains(&serial) => return None,
            DateSystem::Excel1900 if (1.0..60.0).contains(&serial) => {
                NaiveDate::from_ymd_opt(1899, 12, 31)?
            }
            DateSystem::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
            DateSystem::Excel1904 if !(0.0..2_957_004.0).contains(&serial) => return None,
            DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
        };
        let millis = (serial * 86_400_000.0).round() as i64;
        epoch
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
    }
}

/// What a cell needs from the rest of the workbook.
struct CellContext<'a> {
    shared: &'a [String],
    date_styles: &'a [bool],
    dates: DateSystem,
}

// ---------------------------------------------------------------------------
// Sheet cells
// ---------------------------------------------------------------------------

/// Zero-based (row, col) for an A1-style reference.
fn cell_position(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let n = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        col = col.checked_mul(26)?.checked_add(n)?;
    }
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

type SheetCells = BTreeMap<u32, BTreeMap<u32, CellValue>>;

fn parse_sheet(xml: &[u8], context: &CellContext<'_>) -> Result<SheetCells, LoadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut cells: SheetCells = BTreeMap::new();
    let mut row: u32 = 0;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                if let Some(r) = attr(&e, b"r")?.and_then(|v| v.parse::<u32>().ok()) {
                    row = r.saturating_sub(1);
                }
                next_col = 0;
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"row" => row += 1,
            Ok(Event::Start(e)) if e.name().as_ref() == b"c" => {
                let (r, c) = match attr(&e, b"r")? {
                    Some(a) => cell_position(&a)
                        .ok_or_else(|| LoadError::Format(format!("invalid cell reference {a}")))?,
                    None => (row, next_col),
                };
                let value = parse_cell(&mut reader, &e, context)?;
                next_col = c + 1;
                if !value.is_null() {
                    cells.entry(r).or_default().insert(c, value);
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                next_col = match attr(&e, b"r")?.as_deref().and_then(cell_position) {
                    Some((_, c)) => c + 1,
                    None => next_col + 1,
                };
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells)
}

fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    context: &CellContext<'_>,
) -> Result<CellValue, LoadError> {
    let cell_type = attr(start, b"t")?;
    let is_date = attr(start, b"s")?
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|s| context.date_styles.get(s).copied())
        .unwrap_or(false);

    let mut value: Option<String> = None;
    let mut inline: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"v" => {
                let raw = reader.read_text(e.name()).map_err(xml_err)?;
                value = Some(unescape(&raw)?);
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"t" => {
                let raw = reader.read_text(e.name()).map_err(xml_err)?;
                inline.get_or_insert_with(String::new).push_str(&unescape(&raw)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"c" => break,
            Ok(Event::Eof) => return Err(LoadError::Format("unexpected end inside cell".into())),
            Err(e) => return Err(xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(text) = inline {
        return Ok(CellValue::from_text(&text));
    }
    let Some(raw) = value else {
        return Ok(CellValue::Null);
    };
    let trimmed = raw.trim();

    Ok(match cell_type.as_deref() {
        Some("s") => {
            let idx: usize = trimmed
                .parse()
                .map_err(|_| LoadError::Format(format!("bad shared string index {trimmed}")))?;
            let text = context
                .shared
                .get(idx)
                .ok_or_else(|| LoadError::Format(format!("shared string {idx} out of range")))?;
            CellValue::from_text(text)
        }
        Some("b") => CellValue::Bool(trimmed == "1"),
        Some("e") => CellValue::Null,
        Some("str") | Some("inlineStr") => CellValue::from_text(&raw),
        Some("d") => super::timestamp::parse_any(trimmed)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::from_text(trimmed)),
        _ => match trimmed.parse::<f64>() {
            Ok(n) if is_date => context
                .dates
                .to_datetime(n)
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Float(n)),
            Ok(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => CellValue::Integer(n as i64),
            Ok(n) => CellValue::Float(n),
            Err(_) => CellValue::from_text(trimmed),
        },
    })
}

fn build_table(cells: SheetCells) -> Table {
    let source = SourceInfo {
        format: FileFormat::Spreadsheet,
        delimiter: None,
        encoding: "UTF-8",
        decimal_comma: false,
    };
    let Some((&header_row, _)) = cells.iter().next() else {
        return Table::new(Vec::new(), source);
    };
    let first_col = cells
        .values()
        .filter_map(|r| r.keys().next().copied())
        .min()
        .unwrap_or(0);
    let last_col = cells
        .values()
        .filter_map(|r| r.keys().next_back().copied())
        .max()
        .unwrap_or(0);
    let last_row = cells.keys().next_back().copied().unwrap_or(header_row);

    let header_cells = &cells[&header_row];
    let names = normalize_headers((first_col..=last_col).map(|c| {
        header_cells
            .get(&c)
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .unwrap_or_default()
    }));

    let columns = (first_col..=last_col)
        .zip(names)
        .map(|(c, name)| {
            let values = (header_row + 1..=last_row)
                .map(|r| {
                    cells
                        .get(&r)
                        .and_then(|row| row.get(&c))
                        .cloned()
                        .unwrap_or(CellValue::Null)
                })
                .collect();
            Column::new(name, values)
        })
        .collect();
    Table::new(columns, source)
}

// ---------------------------------------------------------------------------
// XML helpers
// ---------------------------------------------------------------------------

fn attr(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, LoadError> {
    for a in element.attributes() {
        let a = a.map_err(|e| LoadError::Format(format!("XML attribute error: {e}")))?;
        if a.key.as_ref() == key {
            let raw = std::str::from_utf8(&a.value)
                .map_err(|e| LoadError::Format(format!("XML attribute is not UTF-8: {e}")))?;
            return Ok(Some(unescape(raw)?));
        }
    }
    Ok(None)
}

fn unescape(raw: &str) -> Result<String, LoadError> {
    quick_xml::escape::unescape(raw)
        .map(|s| s.into_owned())
        .map_err(|e| LoadError::Format(format!("XML escape error: {e}")))
}

fn xml_err(err: quick_xml::Error) -> LoadError {
    LoadError::Format(format!("XML parse error: {err}"))
}
