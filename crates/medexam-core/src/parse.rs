//! Header parser
//!
//! Recovers the identity of each dynamic column of an uploaded sheet from its
//! three header labels. Lookups are global by name, not limited to the
//! campaign's configuration.

use std::collections::BTreeMap;

use tracing::debug;

use crate::cell::decode_text;
use crate::{CampaignId, CatalogReader, Entity, ExamError, HeaderColumnMeta, SheetGrid};

/// Map every labelled column of the sheet header to its identity triple
///
/// Columns missing a group or indicator label (the fixed columns) are skipped.
/// A label that names no known group, indicator or sub-indicator aborts the
/// whole parse: a misresolved column would corrupt every row. A blank group
/// or indicator row is a `Validation` error.
pub fn parse_header<C>(
    catalog: &C,
    sheet: &SheetGrid,
    campaign_id: CampaignId,
) -> Result<BTreeMap<usize, HeaderColumnMeta>, ExamError>
where
    C: CatalogReader + ?Sized,
{
    let Some(last_col) = sheet.last_column(0) else {
        return Err(ExamError::Validation("group header row is empty".into()));
    };
    if sheet.last_column(1).is_none() {
        return Err(ExamError::Validation("indicator header row is empty".into()));
    }

    let mut result = BTreeMap::new();

    for col in 0..=last_col {
        let group_name = decode_text(sheet.cell(0, col));
        let indicator_name = decode_text(sheet.cell(1, col));
        let sub_name = decode_text(sheet.cell(2, col));

        let (Some(group_name), Some(indicator_name)) = (group_name, indicator_name) else {
            continue;
        };

        let group = catalog
            .find_group_by_name(&group_name)?
            .ok_or_else(|| ExamError::not_found(Entity::Group, &group_name))?;

        let indicator = catalog
            .find_indicator_by_name(group.id, &indicator_name)?
            .ok_or_else(|| ExamError::not_found(Entity::Indicator, &indicator_name))?;

        let sub_indicator_id = match sub_name {
            Some(name) => Some(
                catalog
                    .find_sub_indicator_by_name(indicator.id, &name)?
                    .ok_or_else(|| ExamError::not_found(Entity::SubIndicator, &name))?
                    .id,
            ),
            None => None,
        };

        debug!(
            col,
            group = %group.name,
            indicator = %indicator.name,
            ?sub_indicator_id,
            "header column"
        );
        result.insert(col, HeaderColumnMeta::new(group.id, indicator.id, sub_indicator_id));
    }

    debug!(campaign_id, columns = result.len(), "parsed sheet header");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cell, Group, Indicator, MemoryStore, SubIndicator, FIXED_HEADERS};
    use pretty_assertions::assert_eq;

    fn catalog() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_group(Group::new(1, "Vision"));
        store.add_group(Group::new(2, "Dental"));
        store.add_indicator(Indicator::new(10, 1, "Near vision"));
        store.add_indicator(Indicator::new(11, 1, "Hearing").with_sub_indicators());
        store.add_indicator(Indicator::new(20, 2, "Near vision"));
        store.add_sub_indicator(SubIndicator::new(100, 11, "Left ear"));
        store.add_sub_indicator(SubIndicator::new(101, 11, "Right ear"));
        store
    }

    fn vision_sheet() -> SheetGrid {
        let mut sheet = SheetGrid::new();
        for (col, label) in FIXED_HEADERS.iter().enumerate() {
            sheet.set_text(0, col, label);
        }
        for (col, (group, indicator, sub)) in [
            ("Vision", "Near vision", ""),
            ("Vision", "Hearing", "Left ear"),
            ("Vision", "Hearing", "Right ear"),
        ]
        .into_iter()
        .enumerate()
        {
            sheet.set_text(0, 10 + col, group);
            sheet.set_text(1, 10 + col, indicator);
            sheet.set_text(2, 10 + col, sub);
        }
        sheet
    }

    #[test]
    fn resolves_dynamic_columns_and_skips_fixed() {
        let map = parse_header(&catalog(), &vision_sheet(), 1).unwrap();
        let expected: BTreeMap<_, _> = [
            (10, HeaderColumnMeta::new(1, 10, None)),
            (11, HeaderColumnMeta::new(1, 11, Some(100))),
            (12, HeaderColumnMeta::new(1, 11, Some(101))),
        ]
        .into_iter()
        .collect();
        assert_eq!(map, expected);
    }

    #[test]
    fn indicator_lookup_is_scoped_to_group() {
        let mut sheet = vision_sheet();
        sheet.set_text(0, 13, "Dental");
        sheet.set_text(1, 13, "Near vision");
        let map = parse_header(&catalog(), &sheet, 1).unwrap();
        assert_eq!(map[&13], HeaderColumnMeta::new(2, 20, None));
    }

    #[test]
    fn unknown_group_aborts() {
        let mut sheet = vision_sheet();
        sheet.set_text(0, 13, "Nutrition");
        sheet.set_text(1, 13, "BMI");
        let err = parse_header(&catalog(), &sheet, 1).unwrap_err();
        assert!(matches!(
            err,
            ExamError::NotFound { entity: Entity::Group, ref key } if key == "Nutrition"
        ));
    }

    #[test]
    fn unknown_indicator_aborts() {
        let mut sheet = vision_sheet();
        sheet.set_text(1, 10, "Far vision");
        let err = parse_header(&catalog(), &sheet, 1).unwrap_err();
        assert!(matches!(err, ExamError::NotFound { entity: Entity::Indicator, .. }));
    }

    #[test]
    fn unknown_sub_indicator_aborts() {
        let mut sheet = vision_sheet();
        sheet.set_text(2, 12, "Middle ear");
        let err = parse_header(&catalog(), &sheet, 1).unwrap_err();
        assert!(matches!(err, ExamError::NotFound { entity: Entity::SubIndicator, .. }));
    }

    #[test]
    fn missing_indicator_row_is_invalid() {
        let mut sheet = SheetGrid::new();
        sheet.set_text(0, 10, "Vision");
        let err = parse_header(&catalog(), &sheet, 1).unwrap_err();
        assert!(matches!(err, ExamError::Validation(_)));
    }

    #[test]
    fn blank_header_rows_are_invalid() {
        let mut sheet = SheetGrid::new();
        sheet.set(3, 1, Cell::Number(7.0));
        sheet.set_text(3, 10, "X");
        let err = parse_header(&catalog(), &sheet, 1).unwrap_err();
        assert!(matches!(err, ExamError::Validation(_)));
    }

    #[test]
    fn group_row_without_indicator_labels_is_invalid() {
        let mut sheet = SheetGrid::new();
        sheet.set_text(0, 10, "Vision");
        sheet.set(3, 1, Cell::Number(7.0));
        sheet.set_text(3, 10, "X");
        let err = parse_header(&catalog(), &sheet, 1).unwrap_err();
        assert_eq!(err.to_string(), "Invalid sheet: indicator header row is empty");
    }

    #[test]
    fn column_without_indicator_label_is_skipped() {
        let mut sheet = vision_sheet();
        sheet.set_text(0, 13, "Vision");
        let map = parse_header(&catalog(), &sheet, 1).unwrap();
        assert!(!map.contains_key(&13));
        assert_eq!(map.len(), 3);
    }
}
