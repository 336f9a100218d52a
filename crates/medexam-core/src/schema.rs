//! Column schema resolver
//!
//! Flattens a campaign's group → indicator → sub-indicator configuration into
//! the ordered list of dynamic sheet columns. Export and import both depend on
//! this being deterministic for a given configuration.

use tracing::debug;

use crate::{
    CampaignId, CatalogReader, DynamicColumn, Entity, ExamError, FIXED_COLUMN_COUNT,
};

/// Resolve the dynamic columns of a campaign
///
/// Column indices start right after the fixed columns and increase by one per
/// leaf: an indicator without sub-indicators is one leaf, otherwise each of
/// its sub-indicators is.
pub fn resolve_columns<C>(
    catalog: &C,
    campaign_id: CampaignId,
) -> Result<Vec<DynamicColumn>, ExamError>
where
    C: CatalogReader + ?Sized,
{
    let mut columns = Vec::new();
    let mut next_index = FIXED_COLUMN_COUNT;

    for entry in catalog.config_entries(campaign_id)? {
        let group = catalog
            .group(entry.group_id)?
            .ok_or_else(|| ExamError::not_found(Entity::Group, entry.group_id))?;

        for indicator in catalog.indicators(group.id)? {
            if !indicator.has_sub_indicator {
                columns.push(DynamicColumn {
                    group_id: group.id,
                    group_name: group.name.clone(),
                    indicator_id: indicator.id,
                    indicator_name: indicator.name.clone(),
                    sub_indicator_id: None,
                    sub_indicator_name: None,
                    column_index: next_index,
                });
                next_index += 1;
                continue;
            }

            for sub in catalog.sub_indicators(indicator.id)? {
                columns.push(DynamicColumn {
                    group_id: group.id,
                    group_name: group.name.clone(),
                    indicator_id: indicator.id,
                    indicator_name: indicator.name.clone(),
                    sub_indicator_id: Some(sub.id),
                    sub_indicator_name: Some(sub.name),
                    column_index: next_index,
                });
                next_index += 1;
            }
        }
    }

    debug!(campaign_id, columns = columns.len(), "resolved dynamic columns");
    Ok(columns)
}
