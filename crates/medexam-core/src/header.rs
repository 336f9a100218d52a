//! Three-row header layout
//!
//! Row 0 holds group names, row 1 indicator names and row 2 sub-indicator
//! names. Adjacent equal labels are merged into one visual cell, and an
//! indicator without sub-indicators spans rows 1–2. The layout is plain data;
//! the xlsx writer applies it to a worksheet.

use crate::{DynamicColumn, FIXED_COLUMN_COUNT, FIXED_HEADERS, HEADER_ROWS};

/// One labelled header cell; an empty label is written blank
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
}

/// Inclusive rectangular cell range merged into one visual cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeRange {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl MergeRange {
    pub fn row_span(row: usize, first_col: usize, last_col: usize) -> Self {
        Self {
            first_row: row,
            last_row: row,
            first_col,
            last_col,
        }
    }

    pub fn column_span(col: usize, first_row: usize, last_row: usize) -> Self {
        Self {
            first_row,
            last_row,
            first_col: col,
            last_col: col,
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }
}

/// Rendered header: labelled cells, merged ranges and the first free column
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderLayout {
    pub cells: Vec<HeaderCell>,
    pub merges: Vec<MergeRange>,
    /// One past the highest written column
    pub data_start_column: usize,
}

impl HeaderLayout {
    pub fn text_at(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.col == col)
            .map(|c| c.text.as_str())
    }

    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergeRange> {
        self.merges.iter().find(|m| m.contains(row, col))
    }

    fn push(&mut self, row: usize, col: usize, text: &str) {
        self.cells.push(HeaderCell {
            row,
            col,
            text: text.to_string(),
        });
    }
}

/// Build the header layout for a sequence of dynamic columns
pub fn build_header(columns: &[DynamicColumn]) -> HeaderLayout {
    let mut layout = HeaderLayout::default();

    for (col, label) in FIXED_HEADERS.iter().enumerate() {
        layout.push(0, col, label);
        layout.merges.push(MergeRange::column_span(col, 0, HEADER_ROWS - 1));
    }

    for column in columns {
        let c = column.column_index;
        layout.push(0, c, &column.group_name);
        layout.push(1, c, &column.indicator_name);
        layout.push(2, c, column.sub_indicator_name.as_deref().unwrap_or(""));
    }

    let group_keys: Vec<_> = columns
        .iter()
        .map(|c| (c.column_index, Some(c.group_name.as_str())))
        .collect();
    for (first, last) in equal_runs(&group_keys) {
        layout.merges.push(MergeRange::row_span(0, first, last));
    }

    // Row 1 merges on the label alone, independently of row 0. Sub-less
    // columns span rows 1-2 instead, so they never join a row-1 run.
    let indicator_keys: Vec<_> = columns
        .iter()
        .map(|c| {
            let key = c.has_sub_indicator().then_some(c.indicator_name.as_str());
            (c.column_index, key)
        })
        .collect();
    for (first, last) in equal_runs(&indicator_keys) {
        layout.merges.push(MergeRange::row_span(1, first, last));
    }

    for column in columns.iter().filter(|c| !c.has_sub_indicator()) {
        layout
            .merges
            .push(MergeRange::column_span(column.column_index, 1, 2));
    }

    layout.data_start_column = columns
        .iter()
        .map(|c| c.column_index + 1)
        .max()
        .unwrap_or(FIXED_COLUMN_COUNT);
    layout
}

/// Maximal runs of two or more adjacent columns with equal keys
///
/// `None` keys never join a run. Columns are adjacent when their indices
/// differ by one.
fn equal_runs<K: PartialEq>(keys: &[(usize, Option<K>)]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = 0;

    for i in 1..=keys.len() {
        let continues = i < keys.len()
            && keys[i].0 == keys[i - 1].0 + 1
            && keys[i].1.is_some()
            && keys[i].1 == keys[i - 1].1;
        if continues {
            continue;
        }
        if i - start >= 2 && keys[start].1.is_some() {
            runs.push((keys[start].0, keys[i - 1].0));
        }
        start = i;
    }
    runs
}
