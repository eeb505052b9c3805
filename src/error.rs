use thiserror::Error;

/// Failures surfaced to the user as status lines.
#[derive(Error, Debug)]
pub enum DeliverablesError {
    #[error("No file selected. Please browse for a CSV first.")]
    NoFileSelected,

    #[error("No converted workbook yet. Convert a CSV to Excel first.")]
    NotConverted,

    #[error("Please select a C1_MARK value first.")]
    NoFilterSelected,

    #[error("'{label}' column not found{context}")]
    ColumnNotFound { label: String, context: String },

    #[error("First non-empty cell in Column {column} is '{found}', expected '{expected}'")]
    HeaderMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Selected '{value}' not found in {field} items {available:?}")]
    FilterValueNotPresent {
        field: String,
        value: String,
        available: Vec<String>,
    },

    #[error("{marker} header not found in Column {column}")]
    MissingReference { marker: String, column: String },

    #[error("{marker} value below header is empty")]
    EmptyMarkerValue { marker: String },

    #[error("No End Test No. in the Pivot sheet. Generate the pivot table first.")]
    PivotNotGenerated,

    #[error("Sheet '{0}' would replace the data sheet. Rename the CSV and convert again.")]
    SheetNameConflict(String),

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("No worksheets found in {0}")]
    EmptyWorkbook(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unable to read workbook: {0}")]
    Calamine(#[from] calamine::Error),

    #[error("Unable to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl DeliverablesError {
    pub fn column_not_found(label: &str, context: impl Into<String>) -> Self {
        DeliverablesError::ColumnNotFound {
            label: label.to_string(),
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeliverablesError>;
