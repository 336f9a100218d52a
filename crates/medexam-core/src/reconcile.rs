//! Import reconciler
//!
//! Merges the booleans of an uploaded sheet into the results already stored
//! for a campaign. Everything is validated and computed in memory first and
//! written with a single batch call, so a failing import persists nothing.
//!
//! A blank or unparseable result cell leaves any stored value untouched;
//! re-import never clears a result.
//!
//! Two imports running at the same time against one campaign both read the
//! same snapshot, and the later batch write wins. Callers that allow
//! concurrent uploads must serialize imports per campaign.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::cell::{decode_boolean, decode_identifier};
use crate::{
    CampaignId, CatalogReader, Entity, ExamError, HeaderColumnMeta, ResultKey, ResultRecord,
    ResultStore, RosterOrder, RosterReader, SheetGrid, HEADER_ROWS,
};

/// Options for one import call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Acting user recorded in the audit fields of touched records
    pub actor: String,
    /// Column holding the student identifier on data rows
    pub student_id_column: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            actor: "ADMIN".into(),
            student_id_column: 1,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn student_id_column(mut self, column: usize) -> Self {
        self.student_id_column = column;
        self
    }
}

/// Counts reported by a successful import
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Data rows with a student identifier
    pub rows_read: usize,
    /// Data rows skipped for lack of a student identifier
    pub rows_skipped: usize,
    /// Result cells left untouched because they were blank or unparseable
    pub cells_skipped: usize,
    pub created: usize,
    pub updated: usize,
}

/// Upsert the results of a parsed sheet into the campaign's stored results
///
/// `header` maps sheet columns to result identities, as produced by
/// [`crate::parse_header`] on the same sheet.
pub fn reconcile_import<R>(
    repo: &mut R,
    sheet: &SheetGrid,
    campaign_id: CampaignId,
    header: &BTreeMap<usize, HeaderColumnMeta>,
    options: &ImportOptions,
) -> Result<ImportSummary, ExamError>
where
    R: CatalogReader + RosterReader + ResultStore + ?Sized,
{
    if repo.campaign(campaign_id)?.is_none() {
        return Err(ExamError::not_found(Entity::Campaign, campaign_id));
    }

    let roster: HashSet<_> = repo
        .roster(campaign_id, RosterOrder::Unordered)?
        .into_iter()
        .map(|s| s.id)
        .collect();

    let mut records: HashMap<ResultKey, ResultRecord> = repo
        .results(campaign_id)?
        .into_iter()
        .map(|r| (r.key(), r))
        .collect();

    let mut summary = ImportSummary::default();

    for row in HEADER_ROWS..sheet.row_count() {
        let id_cell = sheet.cell(row, options.student_id_column);
        let Some(student_id) = decode_identifier(id_cell) else {
            if !id_cell.is_blank() {
                warn!(row, cell = ?id_cell, "student id cell is not a number, row skipped");
            }
            summary.rows_skipped += 1;
            continue;
        };

        if !roster.contains(&student_id) {
            return Err(ExamError::StudentNotInCampaign {
                student_id,
                campaign_id,
            });
        }
        summary.rows_read += 1;

        for (&col, meta) in header {
            let Some(value) = decode_boolean(sheet.cell(row, col)) else {
                summary.cells_skipped += 1;
                continue;
            };

            let key = ResultKey::new(student_id, campaign_id, *meta);
            match records.get_mut(&key) {
                Some(record) => {
                    record.value = value;
                    record.updated_by = Some(options.actor.clone());
                    summary.updated += 1;
                }
                None => {
                    let mut record = ResultRecord::new(key, value);
                    record.created_by = Some(options.actor.clone());
                    record.updated_by = Some(options.actor.clone());
                    records.insert(key, record);
                    summary.created += 1;
                }
            }
        }
        debug!(row, student_id, "row reconciled");
    }

    let mut batch: Vec<_> = records.into_values().collect();
    batch.sort_by_key(ResultRecord::key);
    repo.save_results(batch)?;

    info!(
        campaign_id,
        rows = summary.rows_read,
        created = summary.created,
        updated = summary.updated,
        "import reconciled"
    );
    Ok(summary)
}
