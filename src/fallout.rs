use serde::Serialize;

use crate::excel::{CellStyle, CellValue, Rgb, Sheet};
use crate::pivot::GRAND_TOTAL;

pub const HEADER: [&str; 3] = ["End Test No.", "Count", "Fallout%"];

pub const HEADER_FILL: Rgb = Rgb(192, 230, 245);
pub const TOP_FALLOUT_FILL: Rgb = Rgb(255, 159, 159);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FalloutRow {
    pub end_test: String,
    pub count: u64,
    pub fallout: String,
}

/// Fallout rows sorted by count, highest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FalloutTable {
    pub rows: Vec<FalloutRow>,
    pub theoretical_total: Option<f64>,
}

pub fn fallout_percent(count: u64, theoretical_total: Option<f64>) -> String {
    let percent = match theoretical_total {
        Some(total) if total != 0.0 => count as f64 / total * 100.0,
        _ => 0.0,
    };
    format!("{percent:.2}%")
}

/// Builds the fallout table from pivot rows of (label, count). Empty labels and
/// the grand total row are skipped; ties keep their pivot order.
pub fn build(pivot_rows: &[(CellValue, CellValue)], theoretical_total: Option<f64>) -> FalloutTable {
    let mut rows: Vec<FalloutRow> = pivot_rows
        .iter()
        .filter(|(label, _)| !label.is_empty() && !label.matches_label(GRAND_TOTAL))
        .map(|(label, count)| {
            let count = count.as_f64().map(|c| c.max(0.0) as u64).unwrap_or(0);
            FalloutRow {
                end_test: label.display(),
                count,
                fallout: fallout_percent(count, theoretical_total),
            }
        })
        .collect();

    // sort_by is stable
    rows.sort_by(|a, b| b.count.cmp(&a.count));

    FalloutTable {
        rows,
        theoretical_total,
    }
}

impl FalloutTable {
    /// The highest-fallout row.
    pub fn top(&self) -> Option<&FalloutRow> {
        self.rows.first()
    }

    /// Header, data rows and the grand total row, as written to the sheet.
    pub fn to_cells(&self) -> Vec<Vec<CellValue>> {
        let mut cells = Vec::with_capacity(self.rows.len() + 2);
        cells.push(HEADER.iter().map(|h| CellValue::text(*h)).collect());

        for row in &self.rows {
            cells.push(vec![
                CellValue::text(row.end_test.clone()),
                CellValue::from(row.count),
                CellValue::text(row.fallout.clone()),
            ]);
        }

        cells.push(vec![
            CellValue::text(GRAND_TOTAL),
            CellValue::from(self.theoretical_total),
            CellValue::Empty,
        ]);
        cells
    }

    pub fn preview_lines(&self) -> Vec<String> {
        let total = self
            .theoretical_total
            .map(|t| CellValue::Float(t).display())
            .unwrap_or_default();

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format!("{:<15}{:<10}{}", HEADER[0], HEADER[1], HEADER[2]));
        for row in &self.rows {
            lines.push(format!("{:<15}{:<10}{}", row.end_test, row.count, row.fallout));
        }
        lines.push(format!("{:<15}{:<10}", GRAND_TOTAL, total));
        lines
    }
}

/// Writes the table with its top-left corner at `anchor` and styles it.
/// Returns the inclusive last row used.
pub fn write(sheet: &mut Sheet, anchor: (usize, usize), table: &FalloutTable) -> usize {
    let (top, left) = anchor;
    let cells = table.to_cells();
    let bottom = top + cells.len() - 1;

    sheet.write_rows(top, left, cells);
    style(sheet, anchor, bottom);
    bottom
}

fn style(sheet: &mut Sheet, anchor: (usize, usize), bottom: usize) {
    let (top, left) = anchor;
    let right = left + HEADER.len() - 1;

    sheet.style_range(top, left, bottom, right, |s| {
        s.centered = true;
        s.border = true;
    });

    let highlight = |fill: Rgb| {
        move |s: &mut CellStyle| {
            s.fill = Some(fill);
            s.bold = true;
        }
    };
    sheet.style_range(top, left, top, right, highlight(HEADER_FILL));
    if bottom > top + 1 {
        sheet.style_range(top + 1, left, top + 1, right, highlight(TOP_FALLOUT_FILL));
    }
    sheet.style_range(bottom, left, bottom, right, highlight(HEADER_FILL));
}

/// Re-applies table styling after the sheet was read back from disk.
pub fn restyle(sheet: &mut Sheet, anchor: (usize, usize)) {
    let (top, left) = anchor;
    if !sheet.value(top, left).matches_label(HEADER[0]) {
        return;
    }

    let bottom = ((top + 1)..=sheet.max_rows)
        .find(|&row| sheet.value(row, left).matches_label(GRAND_TOTAL));
    if let Some(bottom) = bottom {
        style(sheet, anchor, bottom);
    }
}

/// The end-test label of the first data row below the header at `anchor`.
pub fn top_end_test(sheet: &Sheet, anchor: (usize, usize)) -> Option<String> {
    let (top, left) = anchor;
    let value = sheet.value(top + 1, left);
    if value.is_empty() || value.matches_label(GRAND_TOTAL) {
        None
    } else {
        Some(value.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pivot_rows() -> Vec<(CellValue, CellValue)> {
        vec![
            (CellValue::Int(5), CellValue::Int(1)),
            (CellValue::Int(0), CellValue::Int(1)),
            (CellValue::Int(12), CellValue::Int(4)),
            (CellValue::text("Grand Total"), CellValue::Int(6)),
        ]
    }

    #[test]
    fn rows_sort_by_count_and_keep_tie_order() {
        let table = build(&pivot_rows(), Some(8.0));
        let labels: Vec<&str> = table.rows.iter().map(|r| r.end_test.as_str()).collect();

        assert_eq!(labels, vec!["12", "5", "0"]);
        assert_eq!(table.rows[0].fallout, "50.00%");
        assert_eq!(table.rows[1].fallout, "12.50%");
    }

    #[test]
    fn missing_or_zero_total_gives_zero_percent() {
        assert_eq!(fallout_percent(3, None), "0.00%");
        assert_eq!(fallout_percent(3, Some(0.0)), "0.00%");
        assert_eq!(fallout_percent(1, Some(3.0)), "33.33%");
    }

    #[test]
    fn scenario_single_unit_total() {
        let rows = vec![
            (CellValue::Int(5), CellValue::Int(1)),
            (CellValue::Int(0), CellValue::Int(1)),
        ];
        let table = build(&rows, Some(1.0));

        assert_eq!(
            table.rows,
            vec![
                FalloutRow {
                    end_test: "5".into(),
                    count: 1,
                    fallout: "100.00%".into()
                },
                FalloutRow {
                    end_test: "0".into(),
                    count: 1,
                    fallout: "100.00%".into()
                },
            ]
        );

        let cells = table.to_cells();
        assert_eq!(cells[0][0], CellValue::text("End Test No."));
        assert_eq!(
            cells.last().unwrap(),
            &vec![
                CellValue::text("Grand Total"),
                CellValue::Float(1.0),
                CellValue::Empty
            ]
        );
    }

    #[test]
    fn written_table_is_highlighted_and_bordered() {
        let mut sheet = Sheet::new("Pivot");
        let table = build(&pivot_rows(), Some(8.0));
        let bottom = write(&mut sheet, (3, 4), &table);

        assert_eq!(bottom, 7);
        let header = sheet.cell(3, 4).unwrap().style.clone().unwrap();
        assert_eq!(header.fill, Some(HEADER_FILL));
        assert!(header.bold && header.border && header.centered);

        let top_row = sheet.cell(4, 6).unwrap().style.clone().unwrap();
        assert_eq!(top_row.fill, Some(TOP_FALLOUT_FILL));

        let plain = sheet.cell(5, 5).unwrap().style.clone().unwrap();
        assert_eq!(plain.fill, None);
        assert!(!plain.bold && plain.border);

        let total = sheet.cell(7, 6).unwrap().style.clone().unwrap();
        assert_eq!(total.fill, Some(HEADER_FILL));

        assert_eq!(top_end_test(&sheet, (3, 4)), Some("12".to_string()));
    }

    #[test]
    fn restyle_finds_the_table_by_its_header() {
        let mut sheet = Sheet::new("Pivot");
        let table = build(&pivot_rows(), None);
        sheet.write_rows(3, 4, table.to_cells());
        assert!(sheet.cell(3, 4).unwrap().style.is_none());

        restyle(&mut sheet, (3, 4));
        let total = sheet.cell(7, 4).unwrap().style.clone().unwrap();
        assert_eq!(total.fill, Some(HEADER_FILL));
    }

    #[test]
    fn preview_uses_fixed_width_columns() {
        let table = build(&pivot_rows(), Some(8.0));
        let lines = table.preview_lines();
        assert_eq!(lines[0], "End Test No.   Count     Fallout%");
        assert_eq!(lines[1], "12             4         50.00%");
        assert_eq!(lines.last().unwrap().trim_end(), "Grand Total    8");
    }
}
