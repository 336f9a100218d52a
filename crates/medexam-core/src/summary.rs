//! Per-column result tallies for a campaign

use std::collections::HashMap;

use serde::Serialize;

use crate::{DynamicColumn, HeaderColumnMeta, ResultRecord};

/// Result counts for one dynamic column
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnTally {
    pub column: DynamicColumn,
    /// Students with a stored result for the column
    pub recorded: usize,
    /// Students whose stored result is true
    pub marked: usize,
}

/// Count stored and true results per column, in column order
///
/// Records for leaves that are no longer part of the configuration are ignored.
pub fn tally_results(columns: &[DynamicColumn], records: &[ResultRecord]) -> Vec<ColumnTally> {
    let mut counts: HashMap<HeaderColumnMeta, (usize, usize)> = HashMap::new();
    for record in records {
        let entry = counts.entry(record.leaf()).or_default();
        entry.0 += 1;
        if record.value {
            entry.1 += 1;
        }
    }

    columns
        .iter()
        .map(|column| {
            let (recorded, marked) = counts.get(&column.leaf()).copied().unwrap_or_default();
            ColumnTally {
                column: column.clone(),
                recorded,
                marked,
            }
        })
        .collect()
}
