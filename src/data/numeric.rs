use super::model::{CellValue, Column};

/// Best-effort conversion of one cell to a finite number.
///
/// Booleans count as `1`/`0`. Text is trimmed; with `decimal_comma` a single
/// `,` is read as the decimal separator (`"12,5"`), provided the text has no
/// `.`. Anything else, including NaN and infinities, is missing.
pub fn coerce(cell: &CellValue, decimal_comma: bool) -> Option<f64> {
    let value = match cell {
        CellValue::Integer(i) => *i as f64,
        CellValue::Float(f) => *f,
        CellValue::Bool(b) => f64::from(u8::from(*b)),
        CellValue::Text(s) => parse_number(s.trim(), decimal_comma)?,
        CellValue::DateTime(_) | CellValue::Null => return None,
    };
    value.is_finite().then_some(value)
}

fn parse_number(s: &str, decimal_comma: bool) -> Option<f64> {
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    if decimal_comma && !s.contains('.') && s.matches(',').count() == 1 {
        return s.replacen(',', ".", 1).parse::<f64>().ok();
    }
    None
}

/// Coerce every cell of a column.
pub fn coerce_column(column: &Column, decimal_comma: bool) -> Vec<Option<f64>> {
    column
        .cells
        .iter()
        .map(|c| coerce(c, decimal_comma))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn native_values() {
        assert_eq!(coerce(&CellValue::Integer(3), false), Some(3.0));
        assert_eq!(coerce(&CellValue::Float(2.5), false), Some(2.5));
        assert_eq!(coerce(&CellValue::Bool(true), false), Some(1.0));
        assert_eq!(coerce(&CellValue::Float(f64::NAN), false), None);
        assert_eq!(coerce(&CellValue::Null, false), None);
    }

    #[test]
    fn numeric_text() {
        assert_eq!(coerce(&text(" 42 "), false), Some(42.0));
        assert_eq!(coerce(&text("-1.5e3"), false), Some(-1500.0));
        assert_eq!(coerce(&text("5 kW"), false), None);
        assert_eq!(coerce(&text("inf"), false), None);
        assert_eq!(coerce(&text("NaN"), false), None);
    }

    #[test]
    fn decimal_comma_only_when_enabled() {
        assert_eq!(coerce(&text("12,5"), true), Some(12.5));
        assert_eq!(coerce(&text("12,5"), false), None);
        assert_eq!(coerce(&text("1,234,5"), true), None);
        assert_eq!(coerce(&text("1.234,5"), true), None);
    }
}
