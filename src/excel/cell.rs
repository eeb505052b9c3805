use crate::excel::CellStyle;

/// A typed cell value as it is stored in the workbook.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Renders the value the way it reads in a cell: integral numbers without a
    /// decimal point, text trimmed, empty as "".
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => format_number(*f),
            CellValue::Text(s) => s.trim().to_string(),
        }
    }

    /// Case-insensitive, whitespace-trimmed label comparison used for header markers.
    pub fn matches_label(&self, label: &str) -> bool {
        match self {
            CellValue::Text(s) => s.trim().eq_ignore_ascii_case(label.trim()),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(CellValue::Int)
            .unwrap_or(CellValue::Float(value as f64))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map(CellValue::Float).unwrap_or_default()
    }
}

pub fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<CellStyle>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, style: None }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn style_mut(&mut self) -> &mut CellStyle {
        self.style.get_or_insert_with(CellStyle::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_drops_integral_decimal_point() {
        assert_eq!(CellValue::Float(5.0).display(), "5");
        assert_eq!(CellValue::Float(5.5).display(), "5.5");
        assert_eq!(CellValue::Int(-3).display(), "-3");
        assert_eq!(CellValue::text("  A ").display(), "A");
        assert_eq!(CellValue::Empty.display(), "");
    }

    #[test]
    fn label_match_ignores_case_and_padding() {
        assert!(CellValue::text(" c1_mark ").matches_label("C1_MARK"));
        assert!(!CellValue::text("C1_MARKS").matches_label("C1_MARK"));
        assert!(!CellValue::Int(1).matches_label("1"));
    }

    #[test]
    fn whitespace_text_counts_as_empty() {
        assert!(CellValue::text("   ").is_empty());
        assert!(!CellValue::Int(0).is_empty());
    }
}
