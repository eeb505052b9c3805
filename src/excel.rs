mod cell;
mod sheet;
mod style;
mod workbook;

pub use cell::{Cell, CellValue, format_number};
pub use sheet::{MAX_SHEET_NAME_LEN, Sheet, sanitize_sheet_name};
pub use style::{CellStyle, Rgb};
pub use workbook::Workbook;
