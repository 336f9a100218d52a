//! # medexam-core
//!
//! Core domain model and algorithms for medical-examination result sheets.
//!
//! This crate provides:
//! - Domain types: `Group`, `Indicator`, `SubIndicator`, `Student`, `ResultRecord`
//! - Derived sheet types: `DynamicColumn`, `HeaderColumnMeta`, `HeaderLayout`
//! - Repository traits: `CatalogReader`, `RosterReader`, `ResultStore`
//! - The column schema resolver, header builder, header parser and import reconciler
//! - Error types
//!
//! ## Sheet layout
//!
//! ```text
//! row 0 | STT | Họ và tên | ... | TB KQ | Vision      (merged)    |
//! row 1 |     |           |     |       | Near vision | Hearing   |
//! row 2 |     |           |     |       | (merged ↑)  | Left|Right|
//! row 3 | 1   | Nguyễn A  | ... |       | X           |     | X   |
//! ```
//!
//! ## Example
//!
//! ```rust
//! use medexam_core::{
//!     resolve_columns, build_header, Campaign, CampaignConfigEntry, Group, Indicator,
//!     MemoryStore, SubIndicator,
//! };
//!
//! let mut store = MemoryStore::new();
//! store.add_campaign(Campaign::new(1, "Spring 2026"));
//! store.add_group(Group::new(1, "Vision"));
//! store.add_indicator(Indicator::new(10, 1, "Near vision"));
//! store.add_indicator(Indicator::new(11, 1, "Hearing").order(2).with_sub_indicators());
//! store.add_sub_indicator(SubIndicator::new(100, 11, "Left ear"));
//! store.add_sub_indicator(SubIndicator::new(101, 11, "Right ear").order(2));
//! store.add_config_entry(CampaignConfigEntry::new(1, 1, 1));
//!
//! let columns = resolve_columns(&store, 1).unwrap();
//! assert_eq!(columns.len(), 3);
//! assert_eq!(columns[0].column_index, 10);
//!
//! let layout = build_header(&columns);
//! assert_eq!(layout.data_start_column, 13);
//! ```

pub mod cell;
pub mod header;
pub mod parse;
pub mod reconcile;
pub mod schema;
pub mod sheet;
pub mod store;
pub mod summary;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use cell::{decode_boolean, decode_identifier, decode_text, encode_boolean, CachedValue, Cell};
pub use header::{build_header, HeaderCell, HeaderLayout, MergeRange};
pub use parse::parse_header;
pub use reconcile::{reconcile_import, ImportOptions, ImportSummary};
pub use schema::resolve_columns;
pub use sheet::SheetGrid;
pub use store::{MemoryStore, StoreData};
pub use summary::{tally_results, ColumnTally};

// ============================================================================
// Type Aliases and Layout Constants
// ============================================================================

pub type CampaignId = i64;
pub type GroupId = i64;
pub type IndicatorId = i64;
pub type SubIndicatorId = i64;
pub type StudentId = i64;
pub type ResultId = i64;

/// Labels of the fixed columns, in sheet order
pub const FIXED_HEADERS: [&str; 10] = [
    "STT",
    "Họ và tên học sinh",
    "Ngày tháng năm sinh",
    "Nam",
    "Nữ",
    "Địa chỉ",
    "Mã định danh / CCCD",
    "Cân nặng (kg)",
    "Chiều cao (cm)",
    "TB KQ về gia đình",
];

/// Number of fixed columns; dynamic columns start at this index
pub const FIXED_COLUMN_COUNT: usize = FIXED_HEADERS.len();

/// Header rows: group, indicator, sub-indicator
pub const HEADER_ROWS: usize = 3;

/// Worksheet name used by exports
pub const DEFAULT_SHEET_NAME: &str = "Kết quả khám";

// ============================================================================
// Indicator Catalog
// ============================================================================

/// Top-level indicator category (vision, hearing, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

impl Group {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A measurable item within a group
///
/// When `has_sub_indicator` is false the indicator is itself a sheet column;
/// otherwise each of its sub-indicators is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,
    pub group_id: GroupId,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub has_sub_indicator: bool,
}

impl Indicator {
    pub fn new(id: IndicatorId, group_id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            group_id,
            name: name.into(),
            display_order: 1,
            has_sub_indicator: false,
        }
    }

    /// Set the display order within the group
    pub fn order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }

    /// Mark the indicator as having sub-indicators
    pub fn with_sub_indicators(mut self) -> Self {
        self.has_sub_indicator = true;
        self
    }
}

/// Leaf refinement of an indicator (left ear, right ear)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIndicator {
    pub id: SubIndicatorId,
    pub indicator_id: IndicatorId,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

impl SubIndicator {
    pub fn new(id: SubIndicatorId, indicator_id: IndicatorId, name: impl Into<String>) -> Self {
        Self {
            id,
            indicator_id,
            name: name.into(),
            display_order: 1,
        }
    }

    /// Set the display order within the indicator
    pub fn order(mut self, order: i32) -> Self {
        self.display_order = order;
        self
    }
}

// ============================================================================
// Campaigns and Roster
// ============================================================================

/// One examination round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
}

impl Campaign {
    pub fn new(id: CampaignId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Places a group on a campaign's sheet at a display position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfigEntry {
    pub campaign_id: CampaignId,
    pub group_id: GroupId,
    pub display_order: i32,
}

impl CampaignConfigEntry {
    pub fn new(campaign_id: CampaignId, group_id: GroupId, display_order: i32) -> Self {
        Self {
            campaign_id,
            group_id,
            display_order,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

/// A student on a campaign roster
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub campaign_id: CampaignId,
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub identity_number: String,
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
    #[serde(default)]
    pub height_cm: Option<Decimal>,
    #[serde(default)]
    pub notify_family: bool,
    #[serde(default)]
    pub school_id: Option<i64>,
    #[serde(default)]
    pub class_id: Option<i64>,
}

impl Student {
    pub fn new(id: StudentId, campaign_id: CampaignId, full_name: impl Into<String>) -> Self {
        Self {
            id,
            campaign_id,
            full_name: full_name.into(),
            date_of_birth: None,
            gender: Gender::Unspecified,
            address: String::new(),
            identity_number: String::new(),
            weight_kg: None,
            height_cm: None,
            notify_family: false,
            school_id: None,
            class_id: None,
        }
    }

    pub fn born(mut self, date: NaiveDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn identity_number(mut self, number: impl Into<String>) -> Self {
        self.identity_number = number.into();
        self
    }

    /// Set weight (kg) and height (cm)
    pub fn measurements(mut self, weight_kg: Decimal, height_cm: Decimal) -> Self {
        self.weight_kg = Some(weight_kg);
        self.height_cm = Some(height_cm);
        self
    }

    pub fn notify_family(mut self, notify: bool) -> Self {
        self.notify_family = notify;
        self
    }

    /// Place the student in a school and class
    pub fn enrolled(mut self, school_id: i64, class_id: i64) -> Self {
        self.school_id = Some(school_id);
        self.class_id = Some(class_id);
        self
    }
}

/// Roster ordering requested from a [`RosterReader`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RosterOrder {
    #[default]
    Unordered,
    /// Ascending by full name, ties by id
    ByName,
}

/// Optional school/class restriction applied to a roster
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterFilter {
    pub school_id: Option<i64>,
    pub class_id: Option<i64>,
}

impl RosterFilter {
    pub fn matches(&self, student: &Student) -> bool {
        self.school_id.map_or(true, |id| student.school_id == Some(id))
            && self.class_id.map_or(true, |id| student.class_id == Some(id))
    }
}

// ============================================================================
// Sheet Columns and Results
// ============================================================================

/// Identity of one leaf of the indicator hierarchy
///
/// Produced by configuration traversal (via [`DynamicColumn::leaf`]) on export
/// and by name lookup ([`parse_header`]) on import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeaderColumnMeta {
    pub group_id: GroupId,
    pub indicator_id: IndicatorId,
    pub sub_indicator_id: Option<SubIndicatorId>,
}

impl HeaderColumnMeta {
    pub fn new(
        group_id: GroupId,
        indicator_id: IndicatorId,
        sub_indicator_id: Option<SubIndicatorId>,
    ) -> Self {
        Self {
            group_id,
            indicator_id,
            sub_indicator_id,
        }
    }
}

/// One dynamic sheet column for a campaign
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DynamicColumn {
    pub group_id: GroupId,
    pub group_name: String,
    pub indicator_id: IndicatorId,
    pub indicator_name: String,
    pub sub_indicator_id: Option<SubIndicatorId>,
    pub sub_indicator_name: Option<String>,
    pub column_index: usize,
}

impl DynamicColumn {
    pub fn leaf(&self) -> HeaderColumnMeta {
        HeaderColumnMeta::new(self.group_id, self.indicator_id, self.sub_indicator_id)
    }

    pub fn has_sub_indicator(&self) -> bool {
        self.sub_indicator_id.is_some()
    }
}

/// Composite identity of a result: one student, one campaign, one leaf
///
/// A missing sub-indicator is `None`, which never equals any real id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey {
    pub student_id: StudentId,
    pub campaign_id: CampaignId,
    pub leaf: HeaderColumnMeta,
}

impl ResultKey {
    pub fn new(student_id: StudentId, campaign_id: CampaignId, leaf: HeaderColumnMeta) -> Self {
        Self {
            student_id,
            campaign_id,
            leaf,
        }
    }
}

/// Persisted boolean result for one composite identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Storage id, assigned on first save
    #[serde(default)]
    pub id: Option<ResultId>,
    pub student_id: StudentId,
    pub campaign_id: CampaignId,
    pub group_id: GroupId,
    pub indicator_id: IndicatorId,
    #[serde(default)]
    pub sub_indicator_id: Option<SubIndicatorId>,
    pub value: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl ResultRecord {
    pub fn new(key: ResultKey, value: bool) -> Self {
        Self {
            id: None,
            student_id: key.student_id,
            campaign_id: key.campaign_id,
            group_id: key.leaf.group_id,
            indicator_id: key.leaf.indicator_id,
            sub_indicator_id: key.leaf.sub_indicator_id,
            value,
            created_by: None,
            updated_by: None,
        }
    }

    pub fn leaf(&self) -> HeaderColumnMeta {
        HeaderColumnMeta::new(self.group_id, self.indicator_id, self.sub_indicator_id)
    }

    pub fn key(&self) -> ResultKey {
        ResultKey::new(self.student_id, self.campaign_id, self.leaf())
    }
}

// ============================================================================
// Repository Traits
// ============================================================================

/// Read access to campaigns and the indicator catalog
///
/// List operations return items in display order (ties broken by id).
pub trait CatalogReader {
    fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, ExamError>;

    /// Configuration entries of a campaign, in display order
    fn config_entries(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<CampaignConfigEntry>, ExamError>;

    fn group(&self, id: GroupId) -> Result<Option<Group>, ExamError>;

    /// Indicators of a group, in display order
    fn indicators(&self, group_id: GroupId) -> Result<Vec<Indicator>, ExamError>;

    /// Sub-indicators of an indicator, in display order
    fn sub_indicators(&self, indicator_id: IndicatorId) -> Result<Vec<SubIndicator>, ExamError>;

    fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, ExamError>;

    fn find_indicator_by_name(
        &self,
        group_id: GroupId,
        name: &str,
    ) -> Result<Option<Indicator>, ExamError>;

    fn find_sub_indicator_by_name(
        &self,
        indicator_id: IndicatorId,
        name: &str,
    ) -> Result<Option<SubIndicator>, ExamError>;
}

/// Read access to campaign rosters
pub trait RosterReader {
    fn roster(
        &self,
        campaign_id: CampaignId,
        order: RosterOrder,
    ) -> Result<Vec<Student>, ExamError>;
}

/// Result persistence
pub trait ResultStore {
    fn results(&self, campaign_id: CampaignId) -> Result<Vec<ResultRecord>, ExamError>;

    /// Upsert a batch of records by composite identity, all or nothing
    fn save_results(&mut self, records: Vec<ResultRecord>) -> Result<(), ExamError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Kind of entity referenced by a [`ExamError::NotFound`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Campaign,
    Group,
    Indicator,
    SubIndicator,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Campaign => "Campaign",
            Entity::Group => "Group",
            Entity::Indicator => "Indicator",
            Entity::SubIndicator => "Sub-indicator",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExamError {
    #[error("Invalid sheet: {0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    #[error("Student {student_id} does not belong to campaign {campaign_id}")]
    StudentNotInCampaign {
        student_id: StudentId,
        campaign_id: CampaignId,
    },

    #[error(
        "No result column for group {}, indicator {}, sub-indicator {:?}",
        .0.group_id,
        .0.indicator_id,
        .0.sub_indicator_id
    )]
    UnknownLeaf(HeaderColumnMeta),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ExamError {
    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        ExamError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_key_distinguishes_missing_sub_indicator() {
        let without = ResultKey::new(1, 1, HeaderColumnMeta::new(2, 3, None));
        let with_zero = ResultKey::new(1, 1, HeaderColumnMeta::new(2, 3, Some(0)));
        assert_ne!(without, with_zero);
    }

    #[test]
    fn record_key_round_trips_identity() {
        let key = ResultKey::new(7, 1, HeaderColumnMeta::new(2, 3, Some(4)));
        let record = ResultRecord::new(key, true);
        assert_eq!(record.key(), key);
        assert_eq!(record.leaf(), key.leaf);
    }

    #[test]
    fn roster_filter_matches_school_and_class() {
        let student = Student::new(1, 1, "An").enrolled(5, 9);
        assert!(RosterFilter::default().matches(&student));
        let school = RosterFilter {
            school_id: Some(5),
            class_id: None,
        };
        let other_class = RosterFilter {
            school_id: Some(5),
            class_id: Some(8),
        };
        assert!(school.matches(&student));
        assert!(!other_class.matches(&student));
        assert!(!school.matches(&Student::new(2, 1, "Binh")));
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = ExamError::not_found(Entity::SubIndicator, "Left ear");
        assert_eq!(err.to_string(), "Sub-indicator not found: Left ear");
    }
}
