use csv::ReaderBuilder;
use std::path::{Path, PathBuf};

use crate::config::{CoercionPolicy, SheetLayout};
use crate::error::Result;
use crate::excel::{CellValue, Sheet, Workbook, sanitize_sheet_name};
use crate::locate::{C1_MARK, locate_header};

const UTF8_BOM: char = '\u{feff}';

/// Result of turning a CSV export into a workbook on disk.
#[derive(Clone, Debug)]
pub struct Conversion {
    pub workbook_path: PathBuf,
    pub sheet_name: String,
    pub rows: usize,
}

/// Coerces one CSV field: digit-only fields become integers, other parseable
/// finite numbers become floats, everything else stays text.
pub fn coerce_field(field: &str, policy: CoercionPolicy) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }

    if field.chars().all(|c| c.is_ascii_digit()) {
        if policy.preserve_leading_zeros && field.len() > 1 && field.starts_with('0') {
            return CellValue::text(field);
        }
        if let Ok(i) = field.parse::<i64>() {
            return CellValue::Int(i);
        }
    }

    match field.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => CellValue::Float(f),
        _ => CellValue::text(field),
    }
}

/// Reads every record of a comma-delimited file, header row included.
pub fn read_csv<P: AsRef<Path>>(path: P, policy: CoercionPolicy) -> Result<Vec<Vec<CellValue>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut rows = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let record = result?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col_idx, field)| {
                if row_idx == 0 && col_idx == 0 {
                    coerce_field(field.trim_start_matches(UTF8_BOM), policy)
                } else {
                    coerce_field(field, policy)
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// The workbook path for a CSV: same location, `.xlsx` extension.
pub fn workbook_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("xlsx")
}

pub fn sheet_name_for(csv_path: &Path) -> String {
    let stem = csv_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    sanitize_sheet_name(&stem)
}

/// Converts `csv_path` into a one-sheet workbook next to it, overwriting any
/// previous workbook with the same name.
pub fn convert_csv(csv_path: &Path, policy: CoercionPolicy) -> Result<(Workbook, Conversion)> {
    let rows = read_csv(csv_path, policy)?;
    let row_count = rows.len();

    let sheet_name = sheet_name_for(csv_path);
    let workbook_path = workbook_path_for(csv_path);

    let mut workbook = Workbook::new(&workbook_path);
    workbook.push_sheet(Sheet::from_rows(sheet_name.clone(), rows));
    workbook.save()?;

    tracing::info!(
        csv = %csv_path.display(),
        workbook = %workbook_path.display(),
        rows = row_count,
        "converted CSV to workbook"
    );

    Ok((
        workbook,
        Conversion {
            workbook_path,
            sheet_name,
            rows: row_count,
        },
    ))
}

/// Distinct `C1_MARK` values below the header, trimmed, in first-seen order.
pub fn filter_options(sheet: &Sheet, layout: &SheetLayout) -> Result<Vec<String>> {
    let header_row = locate_header(sheet, layout.c1_mark_column, C1_MARK)?;
    let last_row = sheet.last_contiguous_row(layout.c1_mark_column, header_row);

    let mut options: Vec<String> = Vec::new();
    for row in (header_row + 1)..=last_row {
        let value = sheet.value(row, layout.c1_mark_column).display();
        if !value.is_empty() && !options.contains(&value) {
            options.push(value);
        }
    }

    Ok(options)
}
