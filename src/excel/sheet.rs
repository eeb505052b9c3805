use crate::excel::{Cell, CellStyle, CellValue};

/// Longest sheet name a workbook accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// A named grid of cells addressed with 1-based (row, column) indices.
///
/// `data[0]` and column 0 of every row are padding so that indices read like
/// spreadsheet coordinates.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub name: String,
    pub data: Vec<Vec<Cell>>,
    pub max_rows: usize,
    pub max_cols: usize,
    pub show_gridlines: bool,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: vec![vec![Cell::empty(); 1]; 1],
            max_rows: 0,
            max_cols: 0,
            show_gridlines: true,
        }
    }

    /// Builds a sheet from rows of values, row 1 being the first entry.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut sheet = Sheet::new(name);
        sheet.write_rows(1, 1, rows);
        sheet
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY_VALUE)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.data.get(row).and_then(|r| r.get(col))
    }

    pub fn ensure_cell_exists(&mut self, row: usize, col: usize) {
        // Expand rows if needed
        if row >= self.data.len() {
            let row_len = self.data.first().map(|r| r.len()).unwrap_or(1).max(col + 1);
            self.data.resize_with(row + 1, || vec![Cell::empty(); row_len]);
        }

        // Expand columns if needed
        if col >= self.data[0].len() {
            for row_data in &mut self.data {
                row_data.resize_with(col + 1, Cell::empty);
            }
        }
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        if row == 0 || col == 0 {
            return;
        }

        let value = value.into();
        self.ensure_cell_exists(row, col);

        if !value.is_empty() {
            self.max_rows = self.max_rows.max(row);
            self.max_cols = self.max_cols.max(col);
        }
        self.data[row][col].value = value;
    }

    /// Writes a block of rows with its top-left corner at (row, col).
    pub fn write_rows(&mut self, row: usize, col: usize, rows: Vec<Vec<CellValue>>) {
        for (r, values) in rows.into_iter().enumerate() {
            for (c, value) in values.into_iter().enumerate() {
                self.set_value(row + r, col + c, value);
            }
        }
    }

    /// Applies `f` to the style of every cell in the inclusive rectangle.
    pub fn style_range<F>(&mut self, top: usize, left: usize, bottom: usize, right: usize, f: F)
    where
        F: Fn(&mut CellStyle),
    {
        if top == 0 || left == 0 || bottom < top || right < left {
            return;
        }

        self.ensure_cell_exists(bottom, right);
        for row in top..=bottom {
            for col in left..=right {
                f(self.data[row][col].style_mut());
            }
        }
    }

    pub fn set_style(&mut self, row: usize, col: usize, style: CellStyle) {
        if row == 0 || col == 0 {
            return;
        }
        self.ensure_cell_exists(row, col);
        self.data[row][col].style = Some(style);
    }

    pub fn clear(&mut self) {
        self.data = vec![vec![Cell::empty(); 1]; 1];
        self.max_rows = 0;
        self.max_cols = 0;
    }

    /// Row of the first non-empty cell of `col`, scanning down from row 1.
    pub fn first_non_empty_row(&self, col: usize) -> Option<usize> {
        (1..=self.max_rows).find(|&row| !self.value(row, col).is_empty())
    }

    /// Last row of the unbroken run of non-empty cells in `col` that starts at `from_row`.
    pub fn last_contiguous_row(&self, col: usize, from_row: usize) -> usize {
        let mut row = from_row;
        while row < self.max_rows && !self.value(row + 1, col).is_empty() {
            row += 1;
        }
        row
    }

    /// Rightmost populated column of `row`, 0 if the row is empty.
    pub fn last_column_in_row(&self, row: usize) -> usize {
        (1..=self.max_cols)
            .rev()
            .find(|&col| !self.value(row, col).is_empty())
            .unwrap_or(0)
    }

    pub fn row_is_empty(&self, row: usize, first_col: usize, last_col: usize) -> bool {
        (first_col..=last_col).all(|col| self.value(row, col).is_empty())
    }

    pub fn recalculate_max_cols(&mut self) {
        // Find maximum non-empty column across all rows
        self.max_cols = self
            .data
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .rev()
                    .find(|(_, cell)| !cell.value.is_empty())
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0);
    }

    pub fn recalculate_max_rows(&mut self) {
        // Find last row with any non-empty cells
        self.max_rows = self
            .data
            .iter()
            .enumerate()
            .rev()
            .find(|(_, row)| row.iter().any(|cell| !cell.value.is_empty()))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
    }
}

/// Derives a valid sheet name from a file stem: characters a workbook rejects
/// are replaced with `_` and the result is cut to 31 characters.
pub fn sanitize_sheet_name(stem: &str) -> String {
    let name: String = stem
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .map(|c| match c {
            ':' | '/' | '\\' | '?' | '*' | '[' | ']' => '_',
            c => c,
        })
        .collect();

    let name = name.trim_matches('\'').to_string();
    if name.is_empty() {
        "Sheet1".to_string()
    } else {
        name
    }
}
