use calamine::{Data, Range, Reader, open_workbook_auto};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use std::path::{Path, PathBuf};

use crate::error::{DeliverablesError, Result};
use crate::excel::{CellValue, Sheet};

const DEFAULT_COLUMN_WIDTH: f64 = 15.0;

/// An ordered set of sheets backed by a single `.xlsx` file.
///
/// Styles are written but never read back: `open` restores values only.
#[derive(Clone, Debug)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    file_path: PathBuf,
}

impl Workbook {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            sheets: Vec::new(),
            file_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(sheet_names.len());

        for name in &sheet_names {
            let range = workbook.worksheet_range(name)?;
            sheets.push(create_sheet_from_range(name, &range));
        }

        if sheets.is_empty() {
            return Err(DeliverablesError::EmptyWorkbook(path.display().to_string()));
        }

        tracing::debug!(path = %path.display(), sheets = sheets.len(), "workbook opened");

        Ok(Self {
            sheets,
            file_path: path.to_path_buf(),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut [Sheet] {
        &mut self.sheets
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.sheet_index(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheet_index(name)
            .map(|idx| &self.sheets[idx])
            .ok_or_else(|| DeliverablesError::SheetNotFound(name.to_string()))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        match self.sheet_index(name) {
            Some(idx) => Ok(&mut self.sheets[idx]),
            None => Err(DeliverablesError::SheetNotFound(name.to_string())),
        }
    }

    pub fn push_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Returns the named sheet, cleared, or a new empty one placed right after `after`.
    pub fn fresh_sheet_after(&mut self, name: &str, after: &str) -> &mut Sheet {
        if let Some(idx) = self.sheet_index(name) {
            let sheet = &mut self.sheets[idx];
            sheet.clear();
            return sheet;
        }

        let index = self
            .sheet_index(after)
            .map(|idx| idx + 1)
            .unwrap_or(self.sheets.len());
        self.sheets.insert(index, Sheet::new(name));
        &mut self.sheets[index]
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        self.sheet_index(name).map(|idx| self.sheets.remove(idx))
    }

    /// Writes every sheet to `file_path`, replacing any existing file.
    pub fn save(&self) -> Result<()> {
        let mut workbook = XlsxWorkbook::new();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            if !sheet.show_gridlines {
                worksheet.set_screen_gridlines(false);
            }

            // Set column widths
            for col in 0..sheet.max_cols {
                worksheet.set_column_width(col as u16, DEFAULT_COLUMN_WIDTH)?;
            }

            // Write cell data
            for (row, cells) in sheet.data.iter().enumerate().skip(1) {
                for (col, cell) in cells.iter().enumerate().skip(1) {
                    let row_idx = (row - 1) as u32;
                    let col_idx = (col - 1) as u16;
                    let format = cell.style.as_ref().map(|s| s.to_format());

                    match (&cell.value, &format) {
                        (CellValue::Int(i), Some(f)) => {
                            worksheet.write_number_with_format(row_idx, col_idx, *i as f64, f)?;
                        }
                        (CellValue::Int(i), None) => {
                            worksheet.write_number(row_idx, col_idx, *i as f64)?;
                        }
                        (CellValue::Float(n), Some(f)) => {
                            worksheet.write_number_with_format(row_idx, col_idx, *n, f)?;
                        }
                        (CellValue::Float(n), None) => {
                            worksheet.write_number(row_idx, col_idx, *n)?;
                        }
                        (CellValue::Text(s), Some(f)) => {
                            worksheet.write_string_with_format(row_idx, col_idx, s, f)?;
                        }
                        (CellValue::Text(s), None) => {
                            worksheet.write_string(row_idx, col_idx, s)?;
                        }
                        (CellValue::Empty, Some(f)) => {
                            worksheet.write_blank(row_idx, col_idx, f)?;
                        }
                        (CellValue::Empty, None) => {}
                    }
                }
            }
        }

        workbook.save(&self.file_path)?;
        tracing::debug!(path = %self.file_path.display(), "workbook saved");

        Ok(())
    }
}

fn create_sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name);

    // Range indices are relative to the first used cell
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    for (row_idx, col_idx, cell) in range.used_cells() {
        let value = match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Float(*f),
            Data::Int(i) => CellValue::Int(*i),
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
            Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        };

        sheet.set_value(row_offset + row_idx + 1, col_offset + col_idx + 1, value);
    }

    sheet
}
