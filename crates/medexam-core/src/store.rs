//! In-memory repository
//!
//! Backs tests and the CLI's JSON data file. Results are indexed by composite
//! identity so upserts and lookups stay O(1).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    Campaign, CampaignConfigEntry, CampaignId, CatalogReader, ExamError, Group, GroupId,
    HeaderColumnMeta, Indicator, IndicatorId, ResultKey, ResultRecord, ResultStore, RosterOrder,
    RosterReader, Student, SubIndicator,
};

/// Serialized form of a [`MemoryStore`]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
    #[serde(default)]
    pub sub_indicators: Vec<SubIndicator>,
    #[serde(default)]
    pub campaign_config: Vec<CampaignConfigEntry>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

/// Repository holding everything in memory
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "StoreData", into = "StoreData")]
pub struct MemoryStore {
    data: StoreData,
    result_index: HashMap<ResultKey, usize>,
    next_result_id: i64,
}

impl From<StoreData> for MemoryStore {
    fn from(data: StoreData) -> Self {
        let result_index = data
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key(), i))
            .collect();
        let next_result_id = data.results.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            data,
            result_index,
            next_result_id,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from(StoreData::default())
    }
}

impl From<MemoryStore> for StoreData {
    fn from(store: MemoryStore) -> Self {
        store.data
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    pub fn add_campaign(&mut self, campaign: Campaign) {
        self.data.campaigns.push(campaign);
    }

    pub fn add_group(&mut self, group: Group) {
        self.data.groups.push(group);
    }

    pub fn add_indicator(&mut self, indicator: Indicator) {
        self.data.indicators.push(indicator);
    }

    pub fn add_sub_indicator(&mut self, sub: SubIndicator) {
        self.data.sub_indicators.push(sub);
    }

    pub fn add_config_entry(&mut self, entry: CampaignConfigEntry) {
        self.data.campaign_config.push(entry);
    }

    pub fn add_student(&mut self, student: Student) {
        self.data.students.push(student);
    }

    /// Stored result for a composite identity
    pub fn result(&self, key: &ResultKey) -> Option<&ResultRecord> {
        self.result_index.get(key).map(|&i| &self.data.results[i])
    }

    /// Set one result by composite identity, creating it on first use
    ///
    /// The leaf must name an indicator of the group, with one of its
    /// sub-indicators exactly when the indicator has them.
    pub fn set_result(
        &mut self,
        key: ResultKey,
        value: bool,
        actor: &str,
    ) -> Result<&ResultRecord, ExamError> {
        self.check_result_owners(std::slice::from_ref(&key))?;
        self.check_leaf(&key.leaf)?;
        let mut record = match self.result(&key) {
            Some(existing) => existing.clone(),
            None => {
                let mut record = ResultRecord::new(key, value);
                record.created_by = Some(actor.to_string());
                record
            }
        };
        record.value = value;
        record.updated_by = Some(actor.to_string());
        let index = self.upsert(record);
        Ok(&self.data.results[index])
    }

    fn upsert(&mut self, mut record: ResultRecord) -> usize {
        let key = record.key();
        if let Some(&i) = self.result_index.get(&key) {
            record.id = self.data.results[i].id;
            self.data.results[i] = record;
            return i;
        }
        if record.id.is_none() {
            record.id = Some(self.next_result_id);
            self.next_result_id += 1;
        }
        self.data.results.push(record);
        let i = self.data.results.len() - 1;
        self.result_index.insert(key, i);
        i
    }

    /// Every record must reference a known campaign and a student of it
    fn check_result_owners(&self, keys: &[ResultKey]) -> Result<(), ExamError> {
        let campaigns: HashSet<_> = self.data.campaigns.iter().map(|c| c.id).collect();
        let students: HashSet<_> = self
            .data
            .students
            .iter()
            .map(|s| (s.campaign_id, s.id))
            .collect();
        for key in keys {
            if !campaigns.contains(&key.campaign_id) {
                return Err(ExamError::Storage(format!(
                    "result references unknown campaign {}",
                    key.campaign_id
                )));
            }
            if !students.contains(&(key.campaign_id, key.student_id)) {
                return Err(ExamError::StudentNotInCampaign {
                    student_id: key.student_id,
                    campaign_id: key.campaign_id,
                });
            }
        }
        Ok(())
    }

    fn check_leaf(&self, leaf: &HeaderColumnMeta) -> Result<(), ExamError> {
        let Some(indicator) = self
            .data
            .indicators
            .iter()
            .find(|i| i.id == leaf.indicator_id && i.group_id == leaf.group_id)
        else {
            return Err(ExamError::UnknownLeaf(*leaf));
        };
        let known = match leaf.sub_indicator_id {
            Some(sub_id) => {
                indicator.has_sub_indicator
                    && self
                        .data
                        .sub_indicators
                        .iter()
                        .any(|s| s.id == sub_id && s.indicator_id == indicator.id)
            }
            None => !indicator.has_sub_indicator,
        };
        if known {
            Ok(())
        } else {
            Err(ExamError::UnknownLeaf(*leaf))
        }
    }
}

fn sorted_by_order<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

impl CatalogReader for MemoryStore {
    fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>, ExamError> {
        Ok(self.data.campaigns.iter().find(|c| c.id == id).cloned())
    }

    fn config_entries(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<CampaignConfigEntry>, ExamError> {
        let entries = self
            .data
            .campaign_config
            .iter()
            .filter(|e| e.campaign_id == campaign_id)
            .cloned()
            .collect();
        Ok(sorted_by_order(entries, |e| (e.display_order, e.group_id)))
    }

    fn group(&self, id: GroupId) -> Result<Option<Group>, ExamError> {
        Ok(self.data.groups.iter().find(|g| g.id == id).cloned())
    }

    fn indicators(&self, group_id: GroupId) -> Result<Vec<Indicator>, ExamError> {
        let indicators = self
            .data
            .indicators
            .iter()
            .filter(|i| i.group_id == group_id)
            .cloned()
            .collect();
        Ok(sorted_by_order(indicators, |i| (i.display_order, i.id)))
    }

    fn sub_indicators(&self, indicator_id: IndicatorId) -> Result<Vec<SubIndicator>, ExamError> {
        let subs = self
            .data
            .sub_indicators
            .iter()
            .filter(|s| s.indicator_id == indicator_id)
            .cloned()
            .collect();
        Ok(sorted_by_order(subs, |s| (s.display_order, s.id)))
    }

    fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, ExamError> {
        Ok(self.data.groups.iter().find(|g| g.name == name).cloned())
    }

    fn find_indicator_by_name(
        &self,
        group_id: GroupId,
        name: &str,
    ) -> Result<Option<Indicator>, ExamError> {
        Ok(self
            .data
            .indicators
            .iter()
            .find(|i| i.group_id == group_id && i.name == name)
            .cloned())
    }

    fn find_sub_indicator_by_name(
        &self,
        indicator_id: IndicatorId,
        name: &str,
    ) -> Result<Option<SubIndicator>, ExamError> {
        Ok(self
            .data
            .sub_indicators
            .iter()
            .find(|s| s.indicator_id == indicator_id && s.name == name)
            .cloned())
    }
}

impl RosterReader for MemoryStore {
    fn roster(
        &self,
        campaign_id: CampaignId,
        order: RosterOrder,
    ) -> Result<Vec<Student>, ExamError> {
        let mut students: Vec<_> = self
            .data
            .students
            .iter()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect();
        if order == RosterOrder::ByName {
            students.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        }
        Ok(students)
    }
}

impl ResultStore for MemoryStore {
    fn results(&self, campaign_id: CampaignId) -> Result<Vec<ResultRecord>, ExamError> {
        let mut records: Vec<_> = self
            .data
            .results
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect();
        records.sort_by_key(ResultRecord::key);
        Ok(records)
    }

    /// Only identities not stored yet are checked against the roster, so
    /// results of students since removed from it can still be rewritten.
    fn save_results(&mut self, records: Vec<ResultRecord>) -> Result<(), ExamError> {
        let keys: Vec<_> = records
            .iter()
            .map(ResultRecord::key)
            .filter(|key| !self.result_index.contains_key(key))
            .collect();
        self.check_result_owners(&keys)?;
        for record in records {
            self.upsert(record);
        }
        Ok(())
    }
}
