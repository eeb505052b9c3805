//! In-memory pivot aggregation over a rectangular source range.
//!
//! Two shapes are supported: a one-dimensional count per row label (the
//! fallout pivot) and a two-dimensional minimum keyed by row and column labels
//! (the wafermap pivot). Both honour an optional page filter.

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{DeliverablesError, Result};
use crate::excel::{CellValue, Sheet, format_number};

pub const GRAND_TOTAL: &str = "Grand Total";
pub const ROW_LABELS: &str = "Row Labels";
pub const BLANK_LABEL: &str = "(blank)";

/// A grouping key. Numbers compare numerically whether they came from an
/// integer or a float cell; text compares case-sensitively.
#[derive(Clone, Debug)]
pub enum GroupKey {
    Number(f64),
    Text(String),
    Blank,
}

impl GroupKey {
    pub fn from_value(value: &CellValue) -> Self {
        match value {
            CellValue::Int(i) => GroupKey::Number(*i as f64),
            CellValue::Float(f) => GroupKey::Number(*f),
            CellValue::Text(s) if !s.trim().is_empty() => GroupKey::Text(s.clone()),
            _ => GroupKey::Blank,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, GroupKey::Blank)
    }

    pub fn to_cell_value(&self) -> CellValue {
        match self {
            GroupKey::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => CellValue::Int(*n as i64),
            GroupKey::Number(n) => CellValue::Float(*n),
            GroupKey::Text(s) => CellValue::Text(s.clone()),
            GroupKey::Blank => CellValue::text(BLANK_LABEL),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            GroupKey::Number(_) => 0,
            GroupKey::Text(_) => 1,
            GroupKey::Blank => 2,
        }
    }

    fn normalized(n: f64) -> f64 {
        // -0.0 and 0.0 are the same label
        if n == 0.0 { 0.0 } else { n }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            GroupKey::Number(n) => GroupKey::normalized(*n).to_bits().hash(state),
            GroupKey::Text(s) => s.hash(state),
            GroupKey::Blank => {}
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => {
                GroupKey::normalized(*a).total_cmp(&GroupKey::normalized(*b))
            }
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(n) => write!(f, "{}", format_number(*n)),
            GroupKey::Text(s) => write!(f, "{}", s.trim()),
            GroupKey::Blank => write!(f, "{}", BLANK_LABEL),
        }
    }
}

/// Restricts a pivot to the rows whose `field` displays as `value`.
#[derive(Clone, Debug)]
pub struct PageFilter {
    pub field: String,
    pub value: String,
}

impl PageFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A header row plus data rows cut out of a sheet.
#[derive(Clone, Debug, Default)]
pub struct SourceRange {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SourceRange {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// Copies `header_row..=last_row` x `first_col..=last_col` out of `sheet`.
    pub fn from_sheet(
        sheet: &Sheet,
        header_row: usize,
        first_col: usize,
        last_col: usize,
        last_row: usize,
    ) -> Self {
        let headers = (first_col..=last_col)
            .map(|col| sheet.value(header_row, col).display())
            .collect();

        let rows = ((header_row + 1)..=last_row)
            .map(|row| {
                (first_col..=last_col)
                    .map(|col| sheet.value(row, col).clone())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| DeliverablesError::column_not_found(name, " in pivot source range"))
    }

    fn cell(&self, row: &[CellValue], field: usize) -> CellValue {
        row.get(field).cloned().unwrap_or_default()
    }

    /// Distinct displayed values of `field`, in first-seen order.
    pub fn items(&self, field: &str) -> Result<Vec<String>> {
        let idx = self.field_index(field)?;
        let mut items: Vec<String> = Vec::new();
        for row in &self.rows {
            let value = self.cell(row, idx).display();
            if !value.is_empty() && !items.contains(&value) {
                items.push(value);
            }
        }
        Ok(items)
    }

    /// Rows passing `filter`. A filter value that is not one of the field's
    /// items is an error, not an empty selection.
    fn filtered_rows(&self, filter: Option<&PageFilter>) -> Result<Vec<&Vec<CellValue>>> {
        let Some(filter) = filter else {
            return Ok(self.rows.iter().collect());
        };

        let idx = self.field_index(&filter.field)?;
        let wanted = filter.value.trim();
        let items = self.items(&filter.field)?;
        if !items.iter().any(|item| item == wanted) {
            return Err(DeliverablesError::FilterValueNotPresent {
                field: filter.field.clone(),
                value: filter.value.clone(),
                available: items,
            });
        }

        Ok(self
            .rows
            .iter()
            .filter(|row| self.cell(row, idx).display() == wanted)
            .collect())
    }
}

/// Count of non-empty `value_field` cells per `row_field` label.
#[derive(Clone, Debug)]
pub struct CountPivot {
    pub row_field: String,
    pub value_field: String,
    /// Groups in order of first appearance.
    pub groups: IndexMap<GroupKey, u64>,
    pub grand_total: u64,
}

impl CountPivot {
    /// The pivot as it is laid out on a sheet: label header, one row per group,
    /// then the grand total row.
    pub fn to_rows(&self) -> Vec<Vec<CellValue>> {
        let mut rows = Vec::with_capacity(self.groups.len() + 2);
        rows.push(vec![
            CellValue::text(ROW_LABELS),
            CellValue::text(format!("Count of {}", self.value_field)),
        ]);
        for (key, count) in &self.groups {
            rows.push(vec![key.to_cell_value(), CellValue::from(*count)]);
        }
        rows.push(vec![
            CellValue::text(GRAND_TOTAL),
            CellValue::from(self.grand_total),
        ]);
        rows
    }
}

pub fn count_by(
    source: &SourceRange,
    row_field: &str,
    value_field: &str,
    filter: Option<&PageFilter>,
) -> Result<CountPivot> {
    let row_idx = source.field_index(row_field)?;
    let value_idx = source.field_index(value_field)?;

    let mut groups: IndexMap<GroupKey, u64> = IndexMap::new();
    for row in source.filtered_rows(filter)? {
        let key = GroupKey::from_value(&source.cell(row, row_idx));
        let counted = !source.cell(row, value_idx).is_empty();
        *groups.entry(key).or_insert(0) += u64::from(counted);
    }

    let grand_total: u64 = groups.values().sum();
    tracing::debug!(groups = groups.len(), grand_total, "count pivot built");

    Ok(CountPivot {
        row_field: row_field.to_string(),
        value_field: value_field.to_string(),
        groups,
        grand_total,
    })
}

/// Minimum of a numeric field for every (row label, column label) pair.
#[derive(Clone, Debug, Default)]
pub struct MinGrid {
    /// Ascending.
    pub row_keys: Vec<GroupKey>,
    /// Ascending.
    pub col_keys: Vec<GroupKey>,
    pub cells: BTreeMap<(GroupKey, GroupKey), f64>,
}

impl MinGrid {
    pub fn get(&self, row: &GroupKey, col: &GroupKey) -> Option<f64> {
        self.cells.get(&(row.clone(), col.clone())).copied()
    }

    /// The grid as it is laid out on a sheet: `corner` then column labels on
    /// the first row, one row per row label. Missing pairs are empty cells.
    pub fn to_rows(&self, corner: &str) -> Vec<Vec<CellValue>> {
        let mut rows = Vec::with_capacity(self.row_keys.len() + 1);

        let mut header = Vec::with_capacity(self.col_keys.len() + 1);
        header.push(CellValue::text(corner));
        header.extend(self.col_keys.iter().map(GroupKey::to_cell_value));
        rows.push(header);

        for row_key in &self.row_keys {
            let mut row = Vec::with_capacity(self.col_keys.len() + 1);
            row.push(row_key.to_cell_value());
            for col_key in &self.col_keys {
                row.push(
                    self.get(row_key, col_key)
                        .map(|v| GroupKey::Number(v).to_cell_value())
                        .unwrap_or_default(),
                );
            }
            rows.push(row);
        }

        rows
    }
}

/// Rows with a blank row or column label are left out; values that are not
/// numbers do not take part in the minimum.
pub fn min_by(
    source: &SourceRange,
    row_field: &str,
    col_field: &str,
    value_field: &str,
    filter: Option<&PageFilter>,
) -> Result<MinGrid> {
    let row_idx = source.field_index(row_field)?;
    let col_idx = source.field_index(col_field)?;
    let value_idx = source.field_index(value_field)?;

    let mut row_keys = BTreeSet::new();
    let mut col_keys = BTreeSet::new();
    let mut cells: BTreeMap<(GroupKey, GroupKey), f64> = BTreeMap::new();

    for row in source.filtered_rows(filter)? {
        let row_key = GroupKey::from_value(&source.cell(row, row_idx));
        let col_key = GroupKey::from_value(&source.cell(row, col_idx));
        if row_key.is_blank() || col_key.is_blank() {
            continue;
        }

        row_keys.insert(row_key.clone());
        col_keys.insert(col_key.clone());

        if let Some(value) = source.cell(row, value_idx).as_f64() {
            cells
                .entry((row_key, col_key))
                .and_modify(|current| *current = current.min(value))
                .or_insert(value);
        }
    }

    Ok(MinGrid {
        row_keys: row_keys.into_iter().collect(),
        col_keys: col_keys.into_iter().collect(),
        cells,
    })
}
