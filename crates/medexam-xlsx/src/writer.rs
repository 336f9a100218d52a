//! Result sheet writer
//!
//! Generates the campaign result workbook: a 3-row merged header built from
//! the campaign's indicator configuration, then one row per roster student.
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: Kết quả khám
//! | STT | Họ và tên | ... | TB KQ | Vision                           |
//! |     |           |     |       | Near vision | Hearing            |
//! |     |           |     |       |             | Left ear | Right ear |
//! | 1   | Lê An     | ... | TRUE  | X           |          | X       |
//! ```
//!
//! Header rows are frozen and the print area covers every written cell.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::info;

use medexam_core::{
    build_header, encode_boolean, resolve_columns, CampaignId, CatalogReader, DynamicColumn,
    Entity, ExamError, Gender, HeaderColumnMeta, HeaderLayout, ResultStore, RosterFilter,
    RosterOrder, RosterReader, Student, StudentId, DEFAULT_SHEET_NAME, HEADER_ROWS,
};

use crate::WorkbookError;

/// Last column index an XLSX worksheet can hold
const MAX_COL: usize = 16_383;

/// Campaign result workbook writer
#[derive(Clone, Debug)]
pub struct ExcelExporter {
    /// Worksheet name
    pub sheet_name: String,
    /// Whether to freeze the header rows
    pub freeze_header: bool,
    /// Roster restriction (school/class)
    pub filter: RosterFilter,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.into(),
            freeze_header: true,
            filter: RosterFilter::default(),
        }
    }
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worksheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Leave header rows unfrozen
    pub fn no_freeze(mut self) -> Self {
        self.freeze_header = false;
        self
    }

    /// Only export students matching the filter
    pub fn filter(mut self, filter: RosterFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Generate the result workbook of a campaign
    pub fn export_campaign<R>(
        &self,
        repo: &R,
        campaign_id: CampaignId,
    ) -> Result<Vec<u8>, WorkbookError>
    where
        R: CatalogReader + RosterReader + ResultStore + ?Sized,
    {
        let columns = self.campaign_columns(repo, campaign_id)?;

        let students: Vec<Student> = repo
            .roster(campaign_id, RosterOrder::ByName)?
            .into_iter()
            .filter(|s| self.filter.matches(s))
            .collect();

        // Preloaded once so each cell is a hash lookup
        let mut results: HashMap<StudentId, HashMap<HeaderColumnMeta, bool>> = HashMap::new();
        for record in repo.results(campaign_id)? {
            results
                .entry(record.student_id)
                .or_default()
                .insert(record.leaf(), record.value);
        }

        let buffer = self.render(&columns, &students, &results)?;
        info!(campaign_id, students = students.len(), columns = columns.len(), "exported results");
        Ok(buffer)
    }

    /// Generate the header-only workbook users fill in for import
    pub fn export_template<R>(
        &self,
        repo: &R,
        campaign_id: CampaignId,
    ) -> Result<Vec<u8>, WorkbookError>
    where
        R: CatalogReader + ?Sized,
    {
        let columns = self.campaign_columns(repo, campaign_id)?;
        let buffer = self.render(&columns, &[], &HashMap::new())?;
        info!(campaign_id, columns = columns.len(), "exported template");
        Ok(buffer)
    }

    fn campaign_columns<R>(
        &self,
        repo: &R,
        campaign_id: CampaignId,
    ) -> Result<Vec<DynamicColumn>, WorkbookError>
    where
        R: CatalogReader + ?Sized,
    {
        if repo.campaign(campaign_id)?.is_none() {
            return Err(ExamError::not_found(Entity::Campaign, campaign_id).into());
        }
        Ok(resolve_columns(repo, campaign_id)?)
    }

    fn render(
        &self,
        columns: &[DynamicColumn],
        students: &[Student],
        results: &HashMap<StudentId, HashMap<HeaderColumnMeta, bool>>,
    ) -> Result<Vec<u8>, WorkbookError> {
        let mut workbook = Workbook::new();
        let formats = create_formats();
        let layout = build_header(columns);

        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;
        write_header(sheet, &layout, &formats)?;

        sheet.set_column_width(1, 28).ok();
        sheet.set_column_width(2, 14).ok();
        sheet.set_column_width(5, 30).ok();
        sheet.set_column_width(6, 18).ok();

        let empty = HashMap::new();
        for (i, student) in students.iter().enumerate() {
            let row = row_num(HEADER_ROWS + i, 0)?;
            write_fixed_columns(sheet, row, i + 1, student, &formats)?;

            let student_results = results.get(&student.id).unwrap_or(&empty);
            for column in columns {
                let col = col_num(row as usize, column.column_index)?;
                let marker = student_results
                    .get(&column.leaf())
                    .and_then(|&value| encode_boolean(value));
                match marker {
                    Some(marker) => {
                        sheet.write_string_with_format(row, col, marker, &formats.marker)?
                    }
                    None => sheet.write_blank(row, col, &formats.marker)?,
                };
            }
        }

        if self.freeze_header {
            sheet.set_freeze_panes(row_num(HEADER_ROWS, 0)?, 0)?;
        }

        let last_row = row_num(HEADER_ROWS + students.len() - 1, 0)?;
        let last_col = col_num(0, layout.data_start_column - 1)?;
        sheet.set_print_area(0, 0, last_row, last_col)?;

        Ok(workbook.save_to_buffer()?)
    }
}

/// Reusable cell formats
struct ExcelFormats {
    header: Format,
    text: Format,
    number: Format,
    marker: Format,
}

fn create_formats() -> ExcelFormats {
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let text = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let number = Format::new()
        .set_num_format("0.0")
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let marker = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    ExcelFormats {
        header,
        text,
        number,
        marker,
    }
}

/// Write header labels, then merge ranges over them
fn write_header(
    sheet: &mut Worksheet,
    layout: &HeaderLayout,
    formats: &ExcelFormats,
) -> Result<(), WorkbookError> {
    for cell in &layout.cells {
        let row = row_num(cell.row, cell.col)?;
        let col = col_num(cell.row, cell.col)?;
        if cell.text.is_empty() {
            sheet.write_blank(row, col, &formats.header)?;
        } else {
            sheet.write_string_with_format(row, col, &cell.text, &formats.header)?;
        }
    }

    for merge in &layout.merges {
        let text = layout.text_at(merge.first_row, merge.first_col).unwrap_or("");
        sheet.merge_range(
            row_num(merge.first_row, merge.first_col)?,
            col_num(merge.first_row, merge.first_col)?,
            row_num(merge.last_row, merge.last_col)?,
            col_num(merge.last_row, merge.last_col)?,
            text,
            &formats.header,
        )?;
    }
    Ok(())
}

fn write_fixed_columns(
    sheet: &mut Worksheet,
    row: u32,
    sequence: usize,
    student: &Student,
    formats: &ExcelFormats,
) -> Result<(), WorkbookError> {
    sheet.write_number_with_format(row, 0, sequence as f64, &formats.text)?;
    sheet.write_string_with_format(row, 1, &student.full_name, &formats.text)?;
    match student.date_of_birth {
        Some(dob) => {
            let dob = dob.format("%Y-%m-%d").to_string();
            sheet.write_string_with_format(row, 2, dob, &formats.text)?
        }
        None => sheet.write_blank(row, 2, &formats.text)?,
    };

    let (male, female) = match student.gender {
        Gender::Male => (encode_boolean(true), None),
        Gender::Female => (None, encode_boolean(true)),
        Gender::Unspecified => (None, None),
    };
    for (col, marker) in [(3, male), (4, female)] {
        match marker {
            Some(marker) => sheet.write_string_with_format(row, col, marker, &formats.marker)?,
            None => sheet.write_blank(row, col, &formats.marker)?,
        };
    }

    write_optional_text(sheet, row, 5, &student.address, formats)?;
    write_optional_text(sheet, row, 6, &student.identity_number, formats)?;

    for (col, value) in [(7, student.weight_kg), (8, student.height_cm)] {
        match value.and_then(|v| v.to_f64()) {
            Some(v) => sheet.write_number_with_format(row, col, v, &formats.number)?,
            None => sheet.write_blank(row, col, &formats.number)?,
        };
    }

    sheet.write_boolean_with_format(row, 9, student.notify_family, &formats.marker)?;
    Ok(())
}

fn write_optional_text(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    text: &str,
    formats: &ExcelFormats,
) -> Result<(), WorkbookError> {
    if text.is_empty() {
        sheet.write_blank(row, col, &formats.text)?;
    } else {
        sheet.write_string_with_format(row, col, text, &formats.text)?;
    }
    Ok(())
}

fn row_num(row: usize, col: usize) -> Result<u32, WorkbookError> {
    u32::try_from(row).map_err(|_| WorkbookError::OutOfRange { row, col })
}

fn col_num(row: usize, col: usize) -> Result<u16, WorkbookError> {
    if col > MAX_COL {
        return Err(WorkbookError::OutOfRange { row, col });
    }
    u16::try_from(col).map_err(|_| WorkbookError::OutOfRange { row, col })
}
