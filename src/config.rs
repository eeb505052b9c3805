use crate::utils::col_name_to_index;
use crate::wafermap::Palette;

/// Where the export keeps its markers and where derived tables are written.
#[derive(Clone, Debug)]
pub struct SheetLayout {
    /// Column whose first non-empty cell is the `C1_MARK` header.
    pub c1_mark_column: usize,
    /// Column whose first non-empty cell is the `LOLIMIT` header of the limits table.
    pub lolimit_column: usize,
    /// Column holding the `SLOT` and `THEORETICAL_NUM` markers.
    pub marker_column: usize,
    /// Columns between the `THEORETICAL_NUM` marker and its value.
    pub theoretical_value_offset: usize,
    pub testno_column: usize,
    /// First and last column of the six-field limits record.
    pub limits_columns: (usize, usize),
    pub pivot_anchor: (usize, usize),
    pub fallout_anchor: (usize, usize),
    pub limits_anchor: (usize, usize),
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            c1_mark_column: column("G"),
            lolimit_column: column("F"),
            marker_column: column("A"),
            theoretical_value_offset: 2,
            testno_column: column("B"),
            limits_columns: (column("A"), column("F")),
            pivot_anchor: (3, column("A")),
            fallout_anchor: (3, column("D")),
            limits_anchor: (3, column("H")),
        }
    }
}

fn column(name: &str) -> usize {
    col_name_to_index(name).unwrap_or(1)
}

/// How CSV fields are turned into typed cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoercionPolicy {
    /// Keep digit-only fields such as `007` as text instead of numbers.
    pub preserve_leading_zeros: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub layout: SheetLayout,
    pub coercion: CoercionPolicy,
    pub palette: Palette,
}
