//! Wafermap grid: minimum end-test number per (Y, X) die coordinate, laid out
//! with its header row and column mirrored on the far edges.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SheetLayout;
use crate::error::{DeliverablesError, Result};
use crate::excel::{CellStyle, CellValue, Rgb, Sheet, sanitize_sheet_name};
use crate::locate::{C1_MARK, END_TEST_NO, ET, SLOT, X, Y, locate_header, locate_in_row, require_marker};
use crate::pivot::{MinGrid, PageFilter, SourceRange, min_by};

pub const TRANSIENT_SHEET: &str = "Wafermap Pivot Table";
pub const CORNER_LABEL: &str = "No.";

const SHEET_PREFIX: &str = "W#";
const SHEET_SUFFIX: &str = "_wafermap_by_End_Test_No";

pub const HEADER_FILL: Rgb = Rgb(228, 241, 253);
pub const HEADER_FONT: Rgb = Rgb(46, 110, 158);
pub const PASS_FILL: Rgb = Rgb(0, 255, 0);

const CHANNEL_MIN: u8 = 150;

/// Source of the highlight colors for failing dies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Palette {
    /// A fresh color per cell on every render.
    #[default]
    Random,
    /// The same color for the same (row, column) on every render.
    Seeded(u64),
}

impl Palette {
    /// Pins a random palette to a fresh seed so its colors can be applied again.
    pub fn resolve(self) -> Palette {
        match self {
            Palette::Random => Palette::Seeded(rand::random()),
            seeded => seeded,
        }
    }

    pub fn color_for(&self, row: usize, col: usize) -> Rgb {
        match *self {
            Palette::Random => random_color(&mut rand::rng()),
            Palette::Seeded(seed) => {
                let coordinate = ((row as u64) << 32) | col as u64;
                let key = seed ^ coordinate.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                random_color(&mut StdRng::seed_from_u64(key))
            }
        }
    }
}

fn random_color<R: Rng>(rng: &mut R) -> Rgb {
    Rgb(
        rng.random_range(CHANNEL_MIN..=u8::MAX),
        rng.random_range(CHANNEL_MIN..=u8::MAX),
        rng.random_range(CHANNEL_MIN..=u8::MAX),
    )
}

/// Wafer identifier as used in the sheet name: numbers truncated to an integer
/// and padded to two digits, text left-padded with zeros to the same width.
pub fn slot_id(value: &CellValue) -> String {
    match value {
        CellValue::Int(i) => format!("{i:02}"),
        CellValue::Float(f) => format!("{:02}", f.trunc() as i64),
        other => format!("{:0>2}", other.display()),
    }
}

pub fn sheet_name(slot: &str) -> String {
    sanitize_sheet_name(&format!("{SHEET_PREFIX}{slot}{SHEET_SUFFIX}"))
}

pub fn is_wafermap_sheet(name: &str) -> bool {
    name.starts_with(SHEET_PREFIX) && name.ends_with(SHEET_SUFFIX)
}

/// Reads the slot below the `SLOT` marker of the data sheet.
pub fn read_slot(sheet: &Sheet, layout: &SheetLayout) -> Result<String> {
    let row = require_marker(sheet, layout.marker_column, SLOT)?;
    let value = sheet.value(row + 1, layout.marker_column);
    if value.is_empty() {
        return Err(DeliverablesError::EmptyMarkerValue {
            marker: SLOT.to_string(),
        });
    }
    Ok(slot_id(value))
}

/// Groups the data rows below the `C1_MARK` header row into a Y by X grid of
/// minimum ET. With `filter`, only rows with that `C1_MARK` value take part.
pub fn build_grid(sheet: &Sheet, layout: &SheetLayout, filter: Option<&str>) -> Result<MinGrid> {
    let header_row = locate_header(sheet, layout.c1_mark_column, C1_MARK)?;
    let columns = locate_in_row(sheet, header_row, 1, &[&[X], &[Y], &[ET, END_TEST_NO]])?;
    let (x_col, y_col, et_col) = (columns[0], columns[1], columns[2]);

    let last_row = sheet.last_contiguous_row(et_col, header_row);
    let last_col = sheet.last_column_in_row(header_row);
    let source = SourceRange::from_sheet(sheet, header_row, 1, last_col, last_row);

    let field = |col: usize| source.headers[col - 1].clone();
    let page_filter = filter.map(|value| PageFilter::new(C1_MARK, value));

    let grid = min_by(
        &source,
        &field(y_col),
        &field(x_col),
        &field(et_col),
        page_filter.as_ref(),
    )?;

    tracing::debug!(
        rows = grid.row_keys.len(),
        cols = grid.col_keys.len(),
        source_rows = source.rows.len(),
        "wafermap grid built"
    );
    Ok(grid)
}

/// Writes `grid` at A1, mirrors its edges and colors it.
pub fn layout(sheet: &mut Sheet, grid: &MinGrid, palette: Palette) {
    let rows = grid.to_rows(CORNER_LABEL);
    let last_row = rows.len();
    let last_col = rows.iter().map(Vec::len).max().unwrap_or(0);

    let header: Vec<CellValue> = rows.first().cloned().unwrap_or_default();
    let labels: Vec<CellValue> = rows
        .iter()
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect();

    sheet.write_rows(1, 1, rows);
    sheet.write_rows(last_row + 1, 1, vec![header]);
    for (offset, label) in labels.into_iter().enumerate() {
        sheet.set_value(1 + offset, last_col + 1, label);
    }
    sheet.set_value(last_row + 1, last_col + 1, CORNER_LABEL);

    style(sheet, last_row, last_col, palette);
}

/// `last_row` and `last_col` bound the grid before mirroring.
fn style(sheet: &mut Sheet, last_row: usize, last_col: usize, palette: Palette) {
    let (bottom, right) = (last_row + 1, last_col + 1);

    sheet.show_gridlines = false;
    sheet.style_range(1, 1, bottom, right, |s| {
        s.centered = true;
        s.border = true;
    });

    let header = |s: &mut CellStyle| {
        s.fill = Some(HEADER_FILL);
        s.font_color = Some(HEADER_FONT);
        s.bold = true;
    };
    sheet.style_range(1, 1, 1, right, header);
    sheet.style_range(bottom, 1, bottom, right, header);
    sheet.style_range(1, 1, bottom, 1, header);
    sheet.style_range(1, right, bottom, right, header);

    for row in 2..=last_row {
        for col in 2..=last_col {
            let fill = match sheet.value(row, col) {
                value if value.is_empty() => continue,
                value if value.as_f64() == Some(0.0) => PASS_FILL,
                _ => palette.color_for(row, col),
            };
            sheet.style_range(row, col, row, col, |s| s.fill = Some(fill));
        }
    }
}

/// Re-applies the layout styling to a wafermap sheet read back from disk.
pub fn restyle(sheet: &mut Sheet, palette: Palette) {
    if !sheet.value(1, 1).matches_label(CORNER_LABEL) || sheet.max_rows < 2 || sheet.max_cols < 2 {
        return;
    }
    let (last_row, last_col) = (sheet.max_rows - 1, sheet.max_cols - 1);
    style(sheet, last_row, last_col, palette);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::GroupKey;
    use pretty_assertions::assert_eq;

    fn scenario_layout() -> SheetLayout {
        SheetLayout {
            c1_mark_column: 2,
            ..SheetLayout::default()
        }
    }

    fn scenario_sheet() -> Sheet {
        let t = CellValue::text;
        let i = CellValue::Int;
        Sheet::from_rows(
            "lot",
            vec![
                vec![t("ID"), t("C1_MARK"), t("ET"), t("X"), t("Y")],
                vec![i(1), t("A"), i(5), i(0), i(0)],
                vec![i(2), t("A"), i(0), i(0), i(0)],
                vec![i(3), t("B"), i(5), i(1), i(0)],
            ],
        )
    }

    #[test]
    fn filtered_scenario_yields_single_pass_cell() {
        let grid = build_grid(&scenario_sheet(), &scenario_layout(), Some("A")).unwrap();
        assert_eq!(grid.row_keys, vec![GroupKey::Number(0.0)]);
        assert_eq!(grid.col_keys, vec![GroupKey::Number(0.0)]);

        let mut sheet = Sheet::new(sheet_name("03"));
        layout(&mut sheet, &grid, Palette::default());

        assert_eq!(sheet.value(2, 2), &CellValue::Int(0));
        let cell = sheet.cell(2, 2).unwrap().style.clone().unwrap();
        assert_eq!(cell.fill, Some(PASS_FILL));
        assert!(!sheet.show_gridlines);
    }

    #[test]
    fn unfiltered_grid_includes_every_row() {
        let grid = build_grid(&scenario_sheet(), &scenario_layout(), None).unwrap();
        assert_eq!(grid.col_keys.len(), 2);
        assert_eq!(
            grid.get(&GroupKey::Number(0.0), &GroupKey::Number(1.0)),
            Some(5.0)
        );
    }

    #[test]
    fn edges_are_mirrored_with_corner_label() {
        let grid = build_grid(&scenario_sheet(), &scenario_layout(), None).unwrap();
        let mut sheet = Sheet::new("W#01_wafermap_by_End_Test_No");
        layout(&mut sheet, &grid, Palette::Seeded(7));

        // Grid is 2 rows x 3 columns before mirroring.
        let t = CellValue::text;
        let i = CellValue::Int;
        let row = |r: usize| (1..=4).map(|c| sheet.value(r, c).clone()).collect::<Vec<_>>();
        assert_eq!(row(1), vec![t("No."), i(0), i(1), t("No.")]);
        assert_eq!(row(2), vec![i(0), i(0), i(5), i(0)]);
        assert_eq!(row(3), vec![t("No."), i(0), i(1), t("No.")]);

        let mirrored = sheet.cell(3, 3).unwrap().style.clone().unwrap();
        assert_eq!(mirrored.fill, Some(HEADER_FILL));
        assert_eq!(mirrored.font_color, Some(HEADER_FONT));

        let failing = sheet.cell(2, 3).unwrap().style.clone().unwrap();
        assert_eq!(failing.fill, Some(Palette::Seeded(7).color_for(2, 3)));
    }

    #[test]
    fn resolved_palette_is_seeded() {
        assert!(matches!(Palette::Random.resolve(), Palette::Seeded(_)));
        assert_eq!(Palette::Seeded(5).resolve(), Palette::Seeded(5));
    }

    #[test]
    fn seeded_palette_is_stable_and_bright() {
        let palette = Palette::Seeded(42);
        assert_eq!(palette.color_for(4, 9), palette.color_for(4, 9));
        for (row, col) in [(1, 1), (2, 3), (40, 17)] {
            let Rgb(r, g, b) = Palette::Random.color_for(row, col);
            assert!(r >= CHANNEL_MIN && g >= CHANNEL_MIN && b >= CHANNEL_MIN);
        }
    }

    #[test]
    fn restyle_recovers_extents_from_content() {
        let grid = build_grid(&scenario_sheet(), &scenario_layout(), None).unwrap();
        let mut sheet = Sheet::new("W#01_wafermap_by_End_Test_No");
        layout(&mut sheet, &grid, Palette::Seeded(1));

        let mut reopened = Sheet::new(sheet.name.clone());
        for row in 1..=sheet.max_rows {
            for col in 1..=sheet.max_cols {
                reopened.set_value(row, col, sheet.value(row, col).clone());
            }
        }
        restyle(&mut reopened, Palette::Seeded(1));

        for row in 1..=sheet.max_rows {
            for col in 1..=sheet.max_cols {
                assert_eq!(
                    reopened.cell(row, col).and_then(|c| c.style.clone()),
                    sheet.cell(row, col).and_then(|c| c.style.clone()),
                    "style differs at ({row}, {col})"
                );
            }
        }
    }

    #[test]
    fn slot_names_are_zero_padded() {
        assert_eq!(slot_id(&CellValue::Int(3)), "03");
        assert_eq!(slot_id(&CellValue::Float(12.0)), "12");
        assert_eq!(slot_id(&CellValue::Float(3.5)), "03");
        assert_eq!(sheet_name(&slot_id(&CellValue::Float(3.5))), "W#03_wafermap_by_End_Test_No");
        assert_eq!(slot_id(&CellValue::text("7")), "07");
        assert_eq!(sheet_name("03"), "W#03_wafermap_by_End_Test_No");
        assert!(is_wafermap_sheet(&sheet_name("03")));
        assert!(!is_wafermap_sheet("Pivot"));
    }

    #[test]
    fn missing_or_empty_slot_is_reported() {
        let layout = SheetLayout::default();
        assert!(matches!(
            read_slot(&scenario_sheet(), &layout),
            Err(DeliverablesError::MissingReference { .. })
        ));

        let sheet = Sheet::from_rows("lot", vec![vec![CellValue::text("SLOT")], vec![]]);
        assert!(matches!(
            read_slot(&sheet, &layout),
            Err(DeliverablesError::EmptyMarkerValue { .. })
        ));

        let sheet = Sheet::from_rows(
            "lot",
            vec![vec![CellValue::text("SLOT")], vec![CellValue::Int(5)]],
        );
        assert_eq!(read_slot(&sheet, &layout).unwrap(), "05");
    }
}
