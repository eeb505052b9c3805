//! Header and marker lookup on a data sheet.
//!
//! Two kinds of lookup exist. A *header* must be the first non-empty cell of
//! its column; anything else there means the file has a different structure.
//! A *marker* may appear anywhere in its column.

use crate::error::{DeliverablesError, Result};
use crate::excel::Sheet;
use crate::utils::index_to_col_name;

pub const C1_MARK: &str = "C1_MARK";
pub const ET: &str = "ET";
pub const END_TEST_NO: &str = "END TEST NO.";
pub const FT: &str = "FT";
pub const X: &str = "X";
pub const Y: &str = "Y";
pub const LOLIMIT: &str = "LOLIMIT";
pub const SLOT: &str = "SLOT";
pub const THEORETICAL_NUM: &str = "THEORETICAL_NUM";

/// Row of `label` when it is the first non-empty cell in `col`.
pub fn locate_header(sheet: &Sheet, col: usize, label: &str) -> Result<usize> {
    let column = index_to_col_name(col);

    let Some(row) = sheet.first_non_empty_row(col) else {
        return Err(DeliverablesError::column_not_found(
            label,
            format!(" (Column {column} is empty)"),
        ));
    };

    let value = sheet.value(row, col);
    if value.matches_label(label) {
        Ok(row)
    } else {
        Err(DeliverablesError::HeaderMismatch {
            column,
            expected: label.to_string(),
            found: value.display(),
        })
    }
}

/// First row in `col` whose cell equals `label`, if any.
pub fn find_marker(sheet: &Sheet, col: usize, label: &str) -> Option<usize> {
    (1..=sheet.max_rows).find(|&row| sheet.value(row, col).matches_label(label))
}

/// Like [`find_marker`] but a miss is an error naming the marker.
pub fn require_marker(sheet: &Sheet, col: usize, label: &str) -> Result<usize> {
    find_marker(sheet, col, label).ok_or_else(|| DeliverablesError::MissingReference {
        marker: label.to_string(),
        column: index_to_col_name(col),
    })
}

/// First column at or right of `from_col` in `row` whose header matches any of `labels`.
pub fn find_in_row(sheet: &Sheet, row: usize, from_col: usize, labels: &[&str]) -> Option<usize> {
    let last_col = sheet.last_column_in_row(row);
    (from_col..=last_col).find(|&col| {
        let value = sheet.value(row, col);
        labels.iter().any(|label| value.matches_label(label))
    })
}

/// Locates several labels in one header row, scanning from `from_col` to the
/// rightmost populated cell. Each entry of `labels` lists accepted aliases; the
/// result holds one column per entry in the same order.
pub fn locate_in_row(
    sheet: &Sheet,
    row: usize,
    from_col: usize,
    labels: &[&[&str]],
) -> Result<Vec<usize>> {
    labels
        .iter()
        .map(|aliases| {
            find_in_row(sheet, row, from_col, aliases).ok_or_else(|| {
                DeliverablesError::column_not_found(
                    aliases[0],
                    format!(" in header row {row}"),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;

    fn export_sheet() -> Sheet {
        let t = CellValue::text;
        Sheet::from_rows(
            "lot",
            vec![
                vec![t("SLOT")],
                vec![CellValue::Int(3)],
                vec![],
                vec![
                    t("ID"),
                    t("LOT"),
                    t("X"),
                    t("Y"),
                    t("FT"),
                    t("BIN"),
                    t("c1_mark"),
                    t("FT"),
                    t("et"),
                ],
                vec![CellValue::Int(1)],
            ],
        )
    }

    #[test]
    fn header_found_when_first_non_empty_matches() {
        let sheet = export_sheet();
        assert_eq!(locate_header(&sheet, 7, C1_MARK).unwrap(), 4);
    }

    #[test]
    fn wrong_first_label_is_a_header_mismatch() {
        let sheet = export_sheet();
        let err = locate_header(&sheet, 1, C1_MARK).unwrap_err();
        match err {
            DeliverablesError::HeaderMismatch {
                column,
                expected,
                found,
            } => {
                assert_eq!(column, "A");
                assert_eq!(expected, "C1_MARK");
                assert_eq!(found, "SLOT");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_column_is_not_found_rather_than_mismatch() {
        let sheet = export_sheet();
        assert!(matches!(
            locate_header(&sheet, 12, C1_MARK),
            Err(DeliverablesError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn markers_match_anywhere_in_the_column() {
        let sheet = export_sheet();
        assert_eq!(find_marker(&sheet, 1, "slot"), Some(1));
        assert_eq!(find_marker(&sheet, 1, THEORETICAL_NUM), None);
        assert!(matches!(
            require_marker(&sheet, 1, THEORETICAL_NUM),
            Err(DeliverablesError::MissingReference { .. })
        ));
    }

    #[test]
    fn row_scan_starts_at_the_given_column() {
        let sheet = export_sheet();
        // The FT left of C1_MARK is ignored.
        assert_eq!(find_in_row(&sheet, 4, 7, &[FT]), Some(8));
        assert_eq!(find_in_row(&sheet, 4, 7, &[ET]), Some(9));
        assert_eq!(find_in_row(&sheet, 4, 1, &[FT]), Some(5));
    }

    #[test]
    fn multi_label_locate_names_the_missing_label() {
        let sheet = export_sheet();
        assert_eq!(
            locate_in_row(&sheet, 4, 1, &[&[X], &[Y], &[ET, END_TEST_NO]]).unwrap(),
            vec![3, 4, 9]
        );

        let err = locate_in_row(&sheet, 4, 1, &[&[X], &["DIE"]]).unwrap_err();
        assert!(err.to_string().contains("'DIE' column not found"));
    }
}
