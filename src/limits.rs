use serde::Serialize;

use crate::config::SheetLayout;
use crate::error::Result;
use crate::excel::{CellValue, Rgb, Sheet};
use crate::fallout::HEADER_FILL;
use crate::locate::{LOLIMIT, locate_header};

pub const HEADER: [&str; 6] = ["TSNO", "TESTNO", "COMMENT", "MODE", "HILIMIT", "LOLIMIT"];

const RECORD_FILL: Rgb = Rgb::WHITE;

/// One row of the test-limits reference table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LimitsRecord {
    pub tsno: String,
    pub testno: String,
    pub comment: String,
    pub mode: String,
    pub hilimit: String,
    pub lolimit: String,
}

impl LimitsRecord {
    fn from_fields(fields: Vec<String>) -> Self {
        let mut fields = fields.into_iter();
        let mut next = || fields.next().unwrap_or_default();
        Self {
            tsno: next(),
            testno: next(),
            comment: next(),
            mode: next(),
            hilimit: next(),
            lolimit: next(),
        }
    }

    pub fn fields(&self) -> [&str; 6] {
        [
            &self.tsno,
            &self.testno,
            &self.comment,
            &self.mode,
            &self.hilimit,
            &self.lolimit,
        ]
    }

    pub fn has_limits(&self) -> bool {
        !self.lolimit.is_empty()
    }

    pub fn preview_lines(&self) -> Vec<String> {
        vec![
            format!(
                "{:<10}{:<10}{:<15}{:<10}{:<10}{}",
                HEADER[0], HEADER[1], HEADER[2], HEADER[3], HEADER[4], HEADER[5]
            ),
            "-".repeat(70),
            format!(
                "{:<10}{:<10}{:<15}{:<10}{:<10}{}",
                self.tsno, self.testno, self.comment, self.mode, self.hilimit, self.lolimit
            ),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(LimitsRecord),
    NotFound,
}

/// Normalises an identifier for comparison: integral numbers lose their
/// decimal point, text is trimmed, empty stays empty.
pub fn normalize_identifier(value: &CellValue) -> String {
    value.display()
}

/// Finds `end_test` in the TESTNO column of the reference table that starts
/// below the `LOLIMIT` header. The table ends at the first row whose record
/// columns are all empty.
pub fn lookup(sheet: &Sheet, layout: &SheetLayout, end_test: &str) -> Result<LookupOutcome> {
    let header_row = locate_header(sheet, layout.lolimit_column, LOLIMIT)?;
    let (first_col, last_col) = layout.limits_columns;
    let wanted = end_test.trim();

    if wanted.is_empty() {
        return Ok(LookupOutcome::NotFound);
    }

    let mut row = header_row + 1;
    while row <= sheet.max_rows && !sheet.row_is_empty(row, first_col, last_col) {
        if normalize_identifier(sheet.value(row, layout.testno_column)) == wanted {
            let fields = (first_col..=last_col)
                .map(|col| sheet.value(row, col).display())
                .collect();
            tracing::debug!(row, end_test = wanted, "end test found in limits table");
            return Ok(LookupOutcome::Found(LimitsRecord::from_fields(fields)));
        }
        row += 1;
    }

    Ok(LookupOutcome::NotFound)
}

/// Writes the header and the record as a two-row table at `anchor`.
pub fn write(sheet: &mut Sheet, anchor: (usize, usize), record: &LimitsRecord) {
    let (top, left) = anchor;
    sheet.write_rows(
        top,
        left,
        vec![
            HEADER.iter().map(|h| CellValue::text(*h)).collect(),
            record.fields().iter().map(|f| CellValue::from(*f)).collect(),
        ],
    );
    style(sheet, anchor);
}

fn style(sheet: &mut Sheet, anchor: (usize, usize)) {
    let (top, left) = anchor;
    let right = left + HEADER.len() - 1;

    sheet.style_range(top, left, top + 1, right, |s| {
        s.centered = true;
        s.border = true;
        s.bold = true;
    });
    sheet.style_range(top, left, top, right, |s| s.fill = Some(HEADER_FILL));
    sheet.style_range(top + 1, left, top + 1, right, |s| s.fill = Some(RECORD_FILL));
}

pub fn restyle(sheet: &mut Sheet, anchor: (usize, usize)) {
    let (top, left) = anchor;
    if sheet.value(top, left).matches_label(HEADER[0]) {
        style(sheet, anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_sheet() -> Sheet {
        let t = CellValue::text;
        let i = CellValue::Int;
        let f = CellValue::Float;
        Sheet::from_rows(
            "lot",
            vec![
                vec![t("TSNO"), t("TESTNO"), t("COMMENT"), t("MODE"), t("HILIMIT"), t("LOLIMIT")],
                vec![i(1), f(100.0), t("CONT"), t("V"), f(0.9), f(0.2)],
                vec![i(2), f(200.5), t("LEAK"), t("I"), f(1e-6), CellValue::Empty],
                vec![i(3), t(" 300 "), t("VTH"), t("V"), f(1.2), CellValue::Empty],
                vec![],
                vec![i(4), i(400), t("AFTER GAP"), t("V"), f(1.0), f(0.0)],
            ],
        )
    }

    fn layout() -> SheetLayout {
        SheetLayout::default()
    }

    #[test]
    fn integral_float_identifier_matches_integer_query() {
        let outcome = lookup(&reference_sheet(), &layout(), "100").unwrap();
        let LookupOutcome::Found(record) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(record.tsno, "1");
        assert_eq!(record.comment, "CONT");
        assert_eq!(record.lolimit, "0.2");
        assert!(record.has_limits());
    }

    #[test]
    fn non_integral_identifier_never_matches_integer_query() {
        assert_eq!(
            lookup(&reference_sheet(), &layout(), "200").unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn text_identifier_is_trimmed_and_blank_limit_is_reported() {
        let LookupOutcome::Found(record) = lookup(&reference_sheet(), &layout(), "300").unwrap()
        else {
            panic!("expected a match");
        };
        assert!(!record.has_limits());
    }

    #[test]
    fn table_ends_at_first_blank_row() {
        assert_eq!(
            lookup(&reference_sheet(), &layout(), "400").unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn empty_query_is_a_miss() {
        assert_eq!(
            lookup(&reference_sheet(), &layout(), "  ").unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn record_is_written_as_two_styled_rows() {
        let mut sheet = Sheet::new("Pivot");
        let record = LimitsRecord::from_fields(
            ["1", "100", "CONT", "V", "0.9", "0.2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        write(&mut sheet, (3, 8), &record);

        assert_eq!(sheet.value(3, 8), &CellValue::text("TSNO"));
        assert_eq!(sheet.value(4, 13), &CellValue::text("0.2"));
        let header = sheet.cell(3, 13).unwrap().style.clone().unwrap();
        assert_eq!(header.fill, Some(HEADER_FILL));
        let data = sheet.cell(4, 8).unwrap().style.clone().unwrap();
        assert_eq!(data.fill, Some(Rgb::WHITE));
        assert!(data.bold && data.border && data.centered);
        assert_eq!(record.preview_lines()[1].len(), 70);
    }
}
