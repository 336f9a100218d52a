//! In-memory worksheet grid
//!
//! Readers decode a workbook sheet into a `SheetGrid`; the header parser and
//! the import reconciler only ever see this grid.

use crate::cell::Cell;

static BLANK: Cell = Cell::Blank;

/// Dense row-major grid of decoded cells
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetGrid {
    rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Set a cell, growing the grid as needed
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Blank);
        }
        cells[col] = cell;
    }

    /// Set a text cell; an empty string leaves the cell blank
    pub fn set_text(&mut self, row: usize, col: usize, text: &str) {
        if text.is_empty() {
            self.set(row, col, Cell::Blank);
        } else {
            self.set(row, col, Cell::text(text));
        }
    }

    /// Cell at a position; out-of-range positions are blank
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&BLANK)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the last non-blank cell in a row
    pub fn last_column(&self, row: usize) -> Option<usize> {
        self.rows
            .get(row)?
            .iter()
            .rposition(|cell| !matches!(cell, Cell::Blank))
    }

    /// Copy the first cell of a single-row merged range into the other cells
    /// of the range that are blank
    pub fn expand_merge(&mut self, row: usize, first_col: usize, last_col: usize) {
        let anchor = self.cell(row, first_col).clone();
        if matches!(anchor, Cell::Blank) {
            return;
        }
        for col in first_col + 1..=last_col {
            if matches!(self.cell(row, col), Cell::Blank) {
                self.set(row, col, anchor.clone());
            }
        }
    }
}
