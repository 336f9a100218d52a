//! Export tests: workbooks are read back with calamine and checked cell by cell.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use medexam_core::{
    Campaign, CampaignConfigEntry, ExamError, Gender, Group, HeaderColumnMeta, Indicator,
    MemoryStore, ResultKey, RosterFilter, Student, SubIndicator, FIXED_HEADERS,
};
use medexam_xlsx::{read_sheet, ExcelExporter, WorkbookError};
use rust_decimal_macros::dec;

// =============================================================================
// Fixtures
// =============================================================================

/// Campaign 1: group Vision with Near vision (no subs) and Hearing (Left/Right ear)
fn vision_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_campaign(Campaign::new(1, "Spring 2026"));
    store.add_group(Group::new(1, "Vision"));
    store.add_indicator(Indicator::new(10, 1, "Near vision"));
    store.add_indicator(Indicator::new(11, 1, "Hearing").order(2).with_sub_indicators());
    store.add_sub_indicator(SubIndicator::new(100, 11, "Left ear"));
    store.add_sub_indicator(SubIndicator::new(101, 11, "Right ear").order(2));
    store.add_config_entry(CampaignConfigEntry::new(1, 1, 1));

    store.add_student(
        Student::new(1002, 1, "Trần Bình")
            .gender(Gender::Female)
            .enrolled(1, 2),
    );
    store.add_student(
        Student::new(1001, 1, "Lê An")
            .born(NaiveDate::from_ymd_opt(2015, 3, 9).unwrap())
            .gender(Gender::Male)
            .address("12 Lý Thường Kiệt")
            .identity_number("079215000123")
            .measurements(dec!(24.5), dec!(121))
            .notify_family(true)
            .enrolled(1, 1),
    );
    store
}

fn open(bytes: &[u8]) -> (String, calamine::Range<Data>, Xlsx<Cursor<&[u8]>>) {
    let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
    let name = workbook.sheet_names()[0].clone();
    let range = workbook.worksheet_range(&name).unwrap();
    (name, range, workbook)
}

fn text(range: &calamine::Range<Data>, row: u32, col: u32) -> Option<String> {
    match range.get_value((row, col)) {
        Some(Data::String(s)) => Some(s.clone()),
        _ => None,
    }
}

// =============================================================================
// Header
// =============================================================================

#[test]
fn header_rows_follow_configuration() {
    let bytes = ExcelExporter::new().export_campaign(&vision_store(), 1).unwrap();
    let (name, range, _) = open(&bytes);

    assert_eq!(name, "Kết quả khám");
    for (col, label) in FIXED_HEADERS.iter().enumerate() {
        assert_eq!(text(&range, 0, col as u32).as_deref(), Some(*label));
    }
    assert_eq!(text(&range, 0, 10).as_deref(), Some("Vision"));
    assert_eq!(text(&range, 1, 10).as_deref(), Some("Near vision"));
    assert_eq!(text(&range, 1, 11).as_deref(), Some("Hearing"));
    assert_eq!(text(&range, 2, 11).as_deref(), Some("Left ear"));
    assert_eq!(text(&range, 2, 12).as_deref(), Some("Right ear"));
    assert_eq!(text(&range, 2, 10), None);
}

#[test]
fn header_merges_written_to_workbook() {
    let bytes = ExcelExporter::new().export_campaign(&vision_store(), 1).unwrap();
    let (name, _, mut workbook) = open(&bytes);
    workbook.load_merged_regions().unwrap();

    let mut merges: Vec<_> = workbook
        .merged_regions_by_sheet(&name)
        .into_iter()
        .map(|(_, _, dim)| (dim.start, dim.end))
        .collect();
    merges.sort_unstable();

    let mut expected: Vec<_> = (0..10u32).map(|col| ((0, col), (2, col))).collect();
    expected.push(((0, 10), (0, 12)));
    expected.push(((1, 10), (2, 10)));
    expected.push(((1, 11), (1, 12)));
    expected.sort_unstable();

    assert_eq!(merges, expected);
}

// =============================================================================
// Data rows
// =============================================================================

#[test]
fn data_rows_sorted_by_name_with_markers() {
    let mut store = vision_store();
    let near = HeaderColumnMeta::new(1, 10, None);
    let right = HeaderColumnMeta::new(1, 11, Some(101));
    store.set_result(ResultKey::new(1001, 1, near), true, "nurse").unwrap();
    store.set_result(ResultKey::new(1001, 1, right), false, "nurse").unwrap();
    store.set_result(ResultKey::new(1002, 1, right), true, "nurse").unwrap();

    let bytes = ExcelExporter::new().export_campaign(&store, 1).unwrap();
    let (_, range, _) = open(&bytes);

    // "Lê An" sorts before "Trần Bình"
    assert_eq!(range.get_value((3, 0)), Some(&Data::Float(1.0)));
    assert_eq!(text(&range, 3, 1).as_deref(), Some("Lê An"));
    assert_eq!(text(&range, 3, 2).as_deref(), Some("2015-03-09"));
    assert_eq!(text(&range, 3, 3).as_deref(), Some("X"));
    assert_eq!(text(&range, 3, 4), None);
    assert_eq!(text(&range, 3, 5).as_deref(), Some("12 Lý Thường Kiệt"));
    assert_eq!(text(&range, 3, 6).as_deref(), Some("079215000123"));
    assert_eq!(range.get_value((3, 7)), Some(&Data::Float(24.5)));
    assert_eq!(range.get_value((3, 8)), Some(&Data::Float(121.0)));
    assert_eq!(range.get_value((3, 9)), Some(&Data::Bool(true)));

    assert_eq!(text(&range, 3, 10).as_deref(), Some("X"));
    assert_eq!(text(&range, 3, 11), None);
    assert_eq!(text(&range, 3, 12), None);

    assert_eq!(text(&range, 4, 1).as_deref(), Some("Trần Bình"));
    assert_eq!(text(&range, 4, 4).as_deref(), Some("X"));
    assert_eq!(text(&range, 4, 10), None);
    assert_eq!(text(&range, 4, 12).as_deref(), Some("X"));
}

#[test]
fn roster_filter_limits_rows() {
    let exporter = ExcelExporter::new().filter(RosterFilter {
        school_id: Some(1),
        class_id: Some(2),
    });
    let bytes = exporter.export_campaign(&vision_store(), 1).unwrap();
    let grid = read_sheet(&bytes).unwrap();

    assert_eq!(grid.row_count(), 4);
    assert_eq!(grid.cell(3, 1), &medexam_core::Cell::text("Trần Bình"));
}

#[test]
fn template_has_header_only() {
    let bytes = ExcelExporter::new()
        .sheet_name("Mẫu nhập")
        .export_template(&vision_store(), 1)
        .unwrap();
    let (name, _, _) = open(&bytes);
    assert_eq!(name, "Mẫu nhập");

    let grid = read_sheet(&bytes).unwrap();
    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.last_column(0), Some(12));
}

#[test]
fn campaign_without_configuration_has_fixed_columns_only() {
    let mut store = MemoryStore::new();
    store.add_campaign(Campaign::new(7, "Empty"));
    store.add_student(Student::new(1, 7, "An"));

    let bytes = ExcelExporter::new().no_freeze().export_campaign(&store, 7).unwrap();
    let grid = read_sheet(&bytes).unwrap();
    assert_eq!(grid.last_column(0), Some(FIXED_HEADERS.len() - 1));
    assert_eq!(grid.row_count(), 4);
}

#[test]
fn unknown_campaign_is_rejected() {
    let err = ExcelExporter::new()
        .export_campaign(&vision_store(), 99)
        .unwrap_err();
    assert!(matches!(
        err,
        WorkbookError::Exam(ExamError::NotFound { .. })
    ));
    assert_eq!(err.to_string(), "Campaign not found: 99");
}
