//! Uploaded workbook reader
//!
//! Only the first worksheet is read. Formula cells keep the result cached by
//! the last recalculation; nothing is recomputed.

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use tracing::debug;

use medexam_core::{
    parse_header, reconcile_import, CachedValue, CampaignId, CatalogReader, Cell, ImportOptions,
    ImportSummary, ResultStore, RosterReader, SheetGrid,
};

use crate::WorkbookError;

/// Decode the first worksheet of an XLSX workbook
///
/// Merged ranges confined to a single row have their label copied into every
/// cell of the range, so a group or indicator label applies to all the
/// columns it spans. Taller merges are left as written.
pub fn read_sheet(bytes: &[u8]) -> Result<SheetGrid, WorkbookError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(WorkbookError::NoSheets)?;

    let formulas: HashSet<(usize, usize)> = {
        let range = workbook.worksheet_formula(&name)?;
        let (row0, col0) = range.start().unwrap_or((0, 0));
        range
            .used_cells()
            .map(|(row, col, _)| (row0 as usize + row, col0 as usize + col))
            .collect()
    };

    let range = workbook.worksheet_range(&name)?;
    let (row0, col0) = range.start().unwrap_or((0, 0));

    let mut grid = SheetGrid::new();
    for (row, col, value) in range.used_cells() {
        let position = (row0 as usize + row, col0 as usize + col);
        let cell = if formulas.contains(&position) {
            Cell::Formula(convert_cached(value))
        } else {
            convert_value(value)
        };
        grid.set(position.0, position.1, cell);
    }

    // Formulas whose cached result is empty never show up in the value range
    for &(row, col) in &formulas {
        if matches!(grid.cell(row, col), Cell::Blank) {
            grid.set(row, col, Cell::Formula(CachedValue::Blank));
        }
    }

    workbook.load_merged_regions()?;
    for (_, _, dim) in workbook.merged_regions_by_sheet(&name) {
        if dim.start.0 == dim.end.0 {
            grid.expand_merge(dim.start.0 as usize, dim.start.1 as usize, dim.end.1 as usize);
        }
    }

    debug!(sheet = %name, rows = grid.row_count(), "read worksheet");
    Ok(grid)
}

/// Read an uploaded workbook and merge its results into the campaign
pub fn import_workbook<R>(
    repo: &mut R,
    bytes: &[u8],
    campaign_id: CampaignId,
    options: &ImportOptions,
) -> Result<ImportSummary, WorkbookError>
where
    R: CatalogReader + RosterReader + ResultStore + ?Sized,
{
    let grid = read_sheet(bytes)?;
    let header = parse_header(&*repo, &grid, campaign_id)?;
    Ok(reconcile_import(repo, &grid, campaign_id, &header, options)?)
}

fn convert_value(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Blank,
        Data::Bool(v) => Cell::Bool(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::String(v) => Cell::Text(v.clone()),
        Data::Error(e) => Cell::Error(format!("{e:?}")),
        Data::DateTime(v) => Cell::Date(v.as_f64().to_string()),
        Data::DateTimeIso(v) | Data::DurationIso(v) => Cell::Date(v.clone()),
    }
}

fn convert_cached(value: &Data) -> CachedValue {
    match value {
        Data::Empty => CachedValue::Blank,
        Data::Bool(v) => CachedValue::Bool(*v),
        Data::Int(v) => CachedValue::Number(*v as f64),
        Data::Float(v) => CachedValue::Number(*v),
        Data::String(v) => CachedValue::Text(v.clone()),
        Data::Error(e) => CachedValue::Error(format!("{e:?}")),
        // A date result is not a usable identifier or flag
        Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => CachedValue::Blank,
    }
}
