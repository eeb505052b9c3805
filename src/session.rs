//! The workflow behind the four triggers: convert, pivot, check end test and
//! wafermap. Every step after conversion reopens the workbook from disk,
//! restyles its derived sheets, writes and saves.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{SheetLayout, Settings};
use crate::convert::{convert_csv, filter_options};
use crate::error::{DeliverablesError, Result};
use crate::excel::{CellValue, Workbook};
use crate::fallout::{self, FalloutTable};
use crate::limits::{self, LimitsRecord, LookupOutcome};
use crate::locate::{C1_MARK, END_TEST_NO, ET, FT, THEORETICAL_NUM, find_in_row, find_marker, locate_header};
use crate::pivot::{CountPivot, PageFilter, ROW_LABELS, SourceRange, count_by};
use crate::status::{StatusLine, StatusLog};
use crate::utils::range_reference;
use crate::wafermap::{self, Palette};

pub const PIVOT_SHEET: &str = "Pivot";

/// What a successful conversion leaves behind for the later steps.
#[derive(Clone, Debug)]
pub struct Session {
    pub source_csv: PathBuf,
    pub workbook_path: PathBuf,
    pub base_sheet: String,
    pub filter_options: Vec<String>,
    /// Colors of the current wafermap, reapplied whenever the file is reopened.
    pub wafermap_palette: Palette,
}

/// Outcome of writing the fallout pivot.
#[derive(Clone, Debug)]
pub struct PivotReport {
    pub pivot: CountPivot,
    pub fallout: FalloutTable,
    /// A1 range of the written fallout table.
    pub fallout_range: String,
}

/// Opens the session's workbook and re-derives the formatting of the pivot and
/// wafermap sheets, which is not read back from the file. The data sheet is
/// left as is whatever its name.
pub fn open_workbook(session: &Session, layout: &SheetLayout) -> Result<Workbook> {
    let mut workbook = Workbook::open(&session.workbook_path)?;
    for sheet in workbook.sheets_mut() {
        if sheet.name.eq_ignore_ascii_case(&session.base_sheet) {
            continue;
        }
        if sheet.name.eq_ignore_ascii_case(PIVOT_SHEET) {
            fallout::restyle(sheet, layout.fallout_anchor);
            limits::restyle(sheet, layout.limits_anchor);
        } else if wafermap::is_wafermap_sheet(&sheet.name) {
            wafermap::restyle(sheet, session.wafermap_palette);
        }
    }
    Ok(workbook)
}

/// Derived sheets never take the data sheet's place. Sheet names compare
/// case-insensitively, as in Excel.
fn ensure_not_data_sheet(base_sheet: &str, name: &str) -> Result<()> {
    if base_sheet.eq_ignore_ascii_case(name) {
        return Err(DeliverablesError::SheetNameConflict(name.to_string()));
    }
    Ok(())
}

/// Counts the end-test column for rows matching `filter` and writes the raw
/// pivot and the fallout table to the `Pivot` sheet. Does not save.
pub fn write_pivot(
    workbook: &mut Workbook,
    base_sheet: &str,
    layout: &SheetLayout,
    filter: &str,
) -> Result<PivotReport> {
    ensure_not_data_sheet(base_sheet, PIVOT_SHEET)?;
    let data = workbook.sheet(base_sheet)?;
    let c1_col = layout.c1_mark_column;
    let header_row = locate_header(data, c1_col, C1_MARK)?;

    let et_col = find_in_row(data, header_row, c1_col + 1, &[ET, END_TEST_NO])
        .ok_or_else(|| DeliverablesError::column_not_found(ET, " to the right of C1_MARK"))?;
    let last_row = data.last_contiguous_row(c1_col, header_row);
    let source = SourceRange::from_sheet(data, header_row, c1_col, et_col, last_row);

    let et_field = source.headers[et_col - c1_col].clone();
    let value_field = match find_in_row(data, header_row, c1_col + 1, &[FT]) {
        Some(col) if col < et_col => source.headers[col - c1_col].clone(),
        _ => et_field.clone(),
    };

    let theoretical_total = find_marker(data, layout.marker_column, THEORETICAL_NUM).and_then(|row| {
        data.value(row, layout.marker_column + layout.theoretical_value_offset)
            .as_f64()
    });

    let page = PageFilter::new(C1_MARK, filter);
    let pivot = count_by(&source, &et_field, &value_field, Some(&page))?;

    let pivot_rows = pivot.to_rows();
    let labelled: Vec<(CellValue, CellValue)> = pivot_rows
        .iter()
        .skip(1)
        .map(|row| {
            let mut cells = row.iter().cloned();
            (cells.next().unwrap_or_default(), cells.next().unwrap_or_default())
        })
        .collect();
    let table = fallout::build(&labelled, theoretical_total);

    let sheet = workbook.fresh_sheet_after(PIVOT_SHEET, base_sheet);
    sheet.write_rows(
        1,
        1,
        vec![vec![CellValue::text(C1_MARK), CellValue::text(filter.trim())]],
    );
    let (pivot_top, pivot_left) = layout.pivot_anchor;
    sheet.write_rows(pivot_top, pivot_left, pivot_rows);
    let bottom = fallout::write(sheet, layout.fallout_anchor, &table);
    let (top, left) = layout.fallout_anchor;
    let fallout_range = range_reference(top, left, bottom, left + fallout::HEADER.len() - 1);

    tracing::info!(
        filter,
        groups = pivot.groups.len(),
        theoretical_total = ?theoretical_total,
        "pivot written"
    );

    Ok(PivotReport {
        pivot,
        fallout: table,
        fallout_range,
    })
}

/// Looks up the highest-fallout end test of the `Pivot` sheet in the limits
/// table of the data sheet. A match is written next to the fallout table.
/// Does not save.
pub fn check_end_test(
    workbook: &mut Workbook,
    base_sheet: &str,
    layout: &SheetLayout,
) -> Result<(String, LookupOutcome)> {
    ensure_not_data_sheet(base_sheet, PIVOT_SHEET)?;
    let end_test = workbook
        .sheet(PIVOT_SHEET)
        .ok()
        .and_then(|sheet| fallout::top_end_test(sheet, layout.fallout_anchor))
        .ok_or(DeliverablesError::PivotNotGenerated)?;

    let outcome = limits::lookup(workbook.sheet(base_sheet)?, layout, &end_test)?;
    if let LookupOutcome::Found(record) = &outcome {
        limits::write(workbook.sheet_mut(PIVOT_SHEET)?, layout.limits_anchor, record);
    }

    Ok((end_test, outcome))
}

/// Builds the wafermap grid into the transient pivot sheet and copies it to
/// the slot's wafermap sheet. Returns the wafermap sheet name. Does not save.
pub fn write_wafermap(
    workbook: &mut Workbook,
    base_sheet: &str,
    layout: &SheetLayout,
    filter: Option<&str>,
    palette: Palette,
) -> Result<String> {
    let data = workbook.sheet(base_sheet)?;
    let slot = wafermap::read_slot(data, layout)?;
    let grid = wafermap::build_grid(data, layout, filter)?;
    let name = wafermap::sheet_name(&slot);
    ensure_not_data_sheet(base_sheet, wafermap::TRANSIENT_SHEET)?;
    ensure_not_data_sheet(base_sheet, &name)?;

    let transient = workbook.fresh_sheet_after(wafermap::TRANSIENT_SHEET, base_sheet);
    let (pivot_top, pivot_left) = layout.pivot_anchor;
    transient.write_rows(pivot_top, pivot_left, grid.to_rows(ROW_LABELS));

    let sheet = workbook.fresh_sheet_after(&name, wafermap::TRANSIENT_SHEET);
    wafermap::layout(sheet, &grid, palette);

    tracing::info!(sheet = %name, slot = %slot, "wafermap written");
    Ok(name)
}

/// Everything batch mode reports with `--json`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Summary {
    pub workbook: Option<PathBuf>,
    pub filter: Option<String>,
    pub fallout: Option<FalloutTable>,
    pub end_test: Option<String>,
    pub limits: Option<LimitsRecord>,
    pub wafermap_sheet: Option<String>,
    pub status: Vec<StatusLine>,
}

/// Owns the state the triggers share. One action runs at a time; each reports
/// through the status log instead of returning an error.
#[derive(Debug, Default)]
pub struct Controller {
    settings: Settings,
    selected_csv: Option<PathBuf>,
    session: Option<Session>,
    selected_filter: Option<String>,
    status: StatusLog,
    summary: Summary,
}

impl Controller {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusLog {
        &mut self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn selected_file(&self) -> Option<&Path> {
        self.selected_csv.as_deref()
    }

    pub fn filter_options(&self) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.filter_options.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_filter(&self) -> Option<&str> {
        self.selected_filter.as_deref()
    }

    pub fn select_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if path.as_os_str().is_empty() {
            self.selected_csv = None;
            return;
        }
        self.status
            .info(format!("Selected file: {}", path.display()));
        self.selected_csv = Some(path);
    }

    /// Selects a filter value. Values outside the loaded options are accepted
    /// and rejected by the pivot step.
    pub fn select_filter(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.selected_filter = (!value.trim().is_empty()).then_some(value);
    }

    /// Moves the filter selection through the loaded options, wrapping around.
    pub fn cycle_filter(&mut self, forward: bool) {
        let options = self.filter_options();
        if options.is_empty() {
            return;
        }

        let len = options.len();
        let next = match self
            .selected_filter
            .as_ref()
            .and_then(|current| options.iter().position(|o| o == current))
        {
            Some(idx) if forward => (idx + 1) % len,
            Some(idx) => (idx + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        let value = options[next].clone();
        self.selected_filter = Some(value);
    }

    pub fn convert(&mut self) -> bool {
        let result = self.try_convert();
        self.report(result).is_some()
    }

    fn try_convert(&mut self) -> Result<()> {
        let csv = self
            .selected_csv
            .clone()
            .ok_or(DeliverablesError::NoFileSelected)?;

        self.session = None;
        self.selected_filter = None;

        let (workbook, conversion) = convert_csv(&csv, self.settings.coercion)?;
        let options = filter_options(
            workbook.sheet(&conversion.sheet_name)?,
            &self.settings.layout,
        )?;

        self.status.success(format!(
            "Conversion complete: CSV -> .xlsx. File saved at: {}",
            conversion.workbook_path.display()
        ));
        self.status
            .info(format!("Filter options loaded: {}", options.join(", ")));

        self.summary.workbook = Some(conversion.workbook_path.clone());
        self.session = Some(Session {
            source_csv: csv,
            workbook_path: conversion.workbook_path,
            base_sheet: conversion.sheet_name,
            filter_options: options,
            wafermap_palette: self.settings.palette.resolve(),
        });
        Ok(())
    }

    pub fn generate_pivot(&mut self) -> bool {
        let result = self.try_generate_pivot();
        self.report(result).is_some()
    }

    fn try_generate_pivot(&mut self) -> Result<()> {
        let filter = self
            .selected_filter
            .clone()
            .ok_or(DeliverablesError::NoFilterSelected)?;
        let session = self.session.as_ref().ok_or(DeliverablesError::NotConverted)?;
        let layout = &self.settings.layout;

        self.status.info("Generating pivot table...");
        let mut workbook = open_workbook(session, layout)?;
        let report = write_pivot(&mut workbook, &session.base_sheet, layout, &filter)?;
        workbook.save()?;

        self.status.info(format!("Applied filter: {filter}"));
        self.status.info(format!(
            "Fallout table written to {PIVOT_SHEET}!{}",
            report.fallout_range
        ));
        if report.fallout.theoretical_total.is_none() {
            self.status.warning(format!(
                "{THEORETICAL_NUM} not found in Column A; fallout shown as 0.00%"
            ));
        }
        self.status.info("Preview Table:");
        self.status.table(report.fallout.preview_lines());
        self.status
            .success(format!("Successfully generated table for C1_MARK: {filter}"));

        self.summary.filter = Some(filter);
        self.summary.fallout = Some(report.fallout);
        Ok(())
    }

    pub fn check_end_test(&mut self) -> bool {
        let result = self.try_check_end_test();
        self.report(result).is_some()
    }

    fn try_check_end_test(&mut self) -> Result<()> {
        let session = self.session.as_ref().ok_or(DeliverablesError::NotConverted)?;
        let layout = &self.settings.layout;

        let mut workbook = open_workbook(session, layout)?;
        let (end_test, outcome) = check_end_test(&mut workbook, &session.base_sheet, layout)?;
        self.status.info(format!("Checking End Test No.: {end_test}"));

        match outcome {
            LookupOutcome::Found(record) => {
                workbook.save()?;
                self.status.info("End Test No. Reference:");
                self.status.table(record.preview_lines());
                if record.has_limits() {
                    self.status.success("Found with Limits");
                } else {
                    self.status.warning("Found with no Limit");
                }
                self.summary.limits = Some(record);
            }
            LookupOutcome::NotFound => {
                self.status.error("No End Test No. found in the TESTNO Column");
                self.summary.limits = None;
            }
        }

        self.summary.end_test = Some(end_test);
        Ok(())
    }

    pub fn generate_wafermap(&mut self) -> bool {
        let result = self.try_generate_wafermap();
        self.report(result).is_some()
    }

    fn try_generate_wafermap(&mut self) -> Result<()> {
        let mut session = self.session.clone().ok_or(DeliverablesError::NotConverted)?;
        let layout = &self.settings.layout;
        // A new map gets new colors; reopening for later steps keeps them.
        session.wafermap_palette = self.settings.palette.resolve();

        let mut workbook = open_workbook(&session, layout)?;
        let slot = wafermap::read_slot(workbook.sheet(&session.base_sheet)?, layout)?;
        self.status.info(format!("Generating wafermap for W #{slot}..."));

        let name = write_wafermap(
            &mut workbook,
            &session.base_sheet,
            layout,
            self.selected_filter.as_deref(),
            session.wafermap_palette,
        )?;
        workbook.save()?;
        self.session = Some(session.clone());
        self.status
            .success(format!("Wafermap created on {name} sheet."));

        // The transient sheet goes in a second pass over the saved file.
        let mut workbook = open_workbook(&session, layout)?;
        if workbook.remove_sheet(wafermap::TRANSIENT_SHEET).is_some() {
            workbook.save()?;
        }

        self.summary.wafermap_sheet = Some(name);
        Ok(())
    }

    /// Forgets the selected file, the session and the log.
    pub fn clear_all(&mut self) {
        self.selected_csv = None;
        self.session = None;
        self.selected_filter = None;
        self.summary = Summary::default();
        self.status.clear();
        tracing::debug!("session cleared");
    }

    pub fn summary(&self) -> Summary {
        Summary {
            status: self.status.lines().to_vec(),
            ..self.summary.clone()
        }
    }

    fn report<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.status.error(format!("Error: {e}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::Sheet;
    use pretty_assertions::assert_eq;

    fn i(v: i64) -> CellValue {
        CellValue::Int(v)
    }

    fn t(v: &str) -> CellValue {
        CellValue::text(v)
    }

    /// An export with markers above the data header, C1_MARK in column G.
    fn export_workbook() -> Workbook {
        let e = CellValue::Empty;
        let rows = vec![
            vec![t("SLOT")],
            vec![i(3)],
            vec![t("THEORETICAL_NUM"), e.clone(), i(4)],
            vec![t("TSNO"), t("TESTNO"), t("COMMENT"), t("MODE"), t("HILIMIT"), t("LOLIMIT")],
            vec![i(1), i(5), t("CONT"), t("V"), CellValue::Float(0.9), CellValue::Float(0.2)],
            vec![i(2), i(9), t("LEAK"), t("I"), CellValue::Float(1.5), e.clone()],
            vec![],
            vec![t("ID"), t("LOT"), t("X"), t("Y"), t("BIN"), t("SITE"), t("C1_MARK"), t("FT"), t("ET")],
            vec![i(1), t("L1"), i(0), i(0), i(1), i(1), t("A"), i(1), i(5)],
            vec![i(2), t("L1"), i(0), i(0), i(1), i(1), t("A"), i(1), i(0)],
            vec![i(3), t("L1"), i(1), i(0), i(1), i(1), t("B"), i(1), i(5)],
            vec![i(4), t("L1"), i(1), i(1), i(1), i(1), t("A"), i(1), i(9)],
        ];
        let mut workbook = Workbook::new("unused.xlsx");
        workbook.push_sheet(Sheet::from_rows("lot", rows));
        workbook
    }

    #[test]
    fn pivot_counts_ft_for_the_selected_mark() {
        let mut workbook = export_workbook();
        let layout = SheetLayout::default();
        let report = write_pivot(&mut workbook, "lot", &layout, "A").unwrap();

        assert_eq!(report.pivot.value_field, "FT");
        assert_eq!(report.fallout_range, "D3:F7");
        assert_eq!(report.fallout.theoretical_total, Some(4.0));
        let rows: Vec<(String, u64, String)> = report
            .fallout
            .rows
            .iter()
            .map(|r| (r.end_test.clone(), r.count, r.fallout.clone()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("5".to_string(), 1, "25.00%".to_string()),
                ("0".to_string(), 1, "25.00%".to_string()),
                ("9".to_string(), 1, "25.00%".to_string()),
            ]
        );

        assert_eq!(workbook.sheet_names(), vec!["lot", "Pivot"]);
        let pivot = workbook.sheet("Pivot").unwrap();
        assert_eq!(pivot.value(1, 1), &t("C1_MARK"));
        assert_eq!(pivot.value(1, 2), &t("A"));
        assert_eq!(pivot.value(3, 1), &t("Row Labels"));
        assert_eq!(pivot.value(3, 4), &t("End Test No."));
        assert_eq!(pivot.value(4, 4), &t("5"));
    }

    #[test]
    fn unknown_mark_is_reported_with_available_items() {
        let mut workbook = export_workbook();
        let err = write_pivot(&mut workbook, "lot", &SheetLayout::default(), "Z").unwrap_err();
        assert!(err.to_string().contains("not found in C1_MARK items"));
    }

    #[test]
    fn end_test_check_needs_a_pivot() {
        let mut workbook = export_workbook();
        assert!(matches!(
            check_end_test(&mut workbook, "lot", &SheetLayout::default()),
            Err(DeliverablesError::PivotNotGenerated)
        ));
    }

    #[test]
    fn top_end_test_is_looked_up_and_written() {
        let mut workbook = export_workbook();
        let layout = SheetLayout::default();
        write_pivot(&mut workbook, "lot", &layout, "A").unwrap();

        let (end_test, outcome) = check_end_test(&mut workbook, "lot", &layout).unwrap();
        assert_eq!(end_test, "5");
        let LookupOutcome::Found(record) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(record.comment, "CONT");

        let pivot = workbook.sheet("Pivot").unwrap();
        assert_eq!(pivot.value(3, 8), &t("TSNO"));
        assert_eq!(pivot.value(4, 10), &t("CONT"));
    }

    #[test]
    fn wafermap_sheet_follows_the_slot() {
        let mut workbook = export_workbook();
        let layout = SheetLayout::default();
        let name = write_wafermap(&mut workbook, "lot", &layout, Some("A"), Palette::Seeded(3)).unwrap();

        assert_eq!(name, "W#03_wafermap_by_End_Test_No");
        assert_eq!(
            workbook.sheet_names(),
            vec!["lot", "Wafermap Pivot Table", "W#03_wafermap_by_End_Test_No"]
        );

        // Y rows 0 and 1, X columns 0 and 1.
        let sheet = workbook.sheet(&name).unwrap();
        assert_eq!(sheet.value(2, 2), &i(0));
        assert_eq!(sheet.value(2, 3), &CellValue::Empty);
        assert_eq!(sheet.value(3, 3), &i(9));
        assert_eq!(sheet.value(4, 4), &t("No."));
    }

    fn renamed(mut workbook: Workbook, name: &str) -> Workbook {
        workbook.sheets_mut()[0].name = name.to_string();
        workbook
    }

    #[test]
    fn pivot_never_overwrites_a_data_sheet_named_pivot() {
        let mut workbook = renamed(export_workbook(), "pivot");
        let layout = SheetLayout::default();

        let err = write_pivot(&mut workbook, "pivot", &layout, "A").unwrap_err();
        assert!(matches!(err, DeliverablesError::SheetNameConflict(ref name) if name == "Pivot"));
        assert!(matches!(
            check_end_test(&mut workbook, "pivot", &layout),
            Err(DeliverablesError::SheetNameConflict(_))
        ));

        assert_eq!(workbook.sheet_names(), vec!["pivot"]);
        let data = workbook.sheet("pivot").unwrap();
        assert_eq!(data.value(1, 1), &t("SLOT"));
        assert_eq!(data.value(8, 7), &t("C1_MARK"));
    }

    #[test]
    fn wafermap_never_overwrites_the_data_sheet() {
        let layout = SheetLayout::default();
        for base in ["Wafermap Pivot Table", "w#03_wafermap_by_end_test_no"] {
            let mut workbook = renamed(export_workbook(), base);
            let err = write_wafermap(&mut workbook, base, &layout, None, Palette::Seeded(1)).unwrap_err();
            assert!(matches!(err, DeliverablesError::SheetNameConflict(_)), "{base}");
            assert_eq!(workbook.sheet_names(), vec![base]);
            assert_eq!(workbook.sheet(base).unwrap().value(1, 1), &t("SLOT"));
        }
    }

    #[test]
    fn filter_cycles_through_loaded_options() {
        let mut controller = Controller::default();
        controller.cycle_filter(true);
        assert_eq!(controller.selected_filter(), None);

        controller.session = Some(Session {
            source_csv: PathBuf::from("lot.csv"),
            workbook_path: PathBuf::from("lot.xlsx"),
            base_sheet: "lot".into(),
            filter_options: vec!["A".into(), "B".into()],
            wafermap_palette: Palette::Seeded(1),
        });
        controller.cycle_filter(true);
        assert_eq!(controller.selected_filter(), Some("A"));
        controller.cycle_filter(true);
        assert_eq!(controller.selected_filter(), Some("B"));
        controller.cycle_filter(true);
        assert_eq!(controller.selected_filter(), Some("A"));
        controller.cycle_filter(false);
        assert_eq!(controller.selected_filter(), Some("B"));
    }

    #[test]
    fn actions_without_a_session_report_errors() {
        let mut controller = Controller::default();
        assert!(!controller.convert());
        controller.select_filter("A");
        assert!(!controller.generate_pivot());
        assert!(!controller.generate_wafermap());

        let texts: Vec<&str> = controller
            .status()
            .lines()
            .iter()
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(
            texts,
            vec![
                "Error: No file selected. Please browse for a CSV first.",
                "Error: No converted workbook yet. Convert a CSV to Excel first.",
                "Error: No converted workbook yet. Convert a CSV to Excel first.",
            ]
        );

        controller.clear_all();
        assert!(controller.status().is_empty());
        assert_eq!(controller.selected_filter(), None);
    }
}
