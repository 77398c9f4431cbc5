//! Engagement record store with atomic event correlation.
//!
//! Records live in per-(recipient, campaign) buckets. `DashMap::get_mut`
//! hands the caller exclusive access to one bucket, so "find the most recent
//! unset record, then set it" executes as a single conditional update: under
//! concurrent hits at most one writer wins and no record is double-updated.
//!
//! Production: replace with a transactional relational store; the update
//! becomes a single `UPDATE ... WHERE ... AND open_time IS NULL` statement.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use smartreach_core::history::EngagementHistory;
use smartreach_core::types::EngagementRecord;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RecordKey {
    recipient_id: Uuid,
    org_id: Uuid,
    campaign_id: Uuid,
}

pub struct EngagementStore {
    records: DashMap<RecordKey, Vec<EngagementRecord>>,
}

impl EngagementStore {
    pub fn new() -> Self {
        info!("Engagement store initialized (in-memory, development mode)");
        Self { records: DashMap::new() }
    }

    /// Set `open_time_utc` on the most recent record for the key whose open
    /// time is still null (send-time descending). Returns the updated record,
    /// or `None` when every record is already opened or none exist.
    pub fn mark_opened(
        &self,
        recipient_id: Uuid,
        org_id: Uuid,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<EngagementRecord> {
        let key = RecordKey { recipient_id, org_id, campaign_id };
        let mut bucket = self.records.get_mut(&key)?;
        let record = bucket
            .iter_mut()
            .filter(|r| r.open_time_utc.is_none())
            .max_by_key(|r| r.send_time_utc)?;
        record.open_time_utc = Some(now);
        record.open_delay_seconds = Some((now - record.send_time_utc).num_seconds());
        Some(record.clone())
    }

    /// Same as [`mark_opened`](Self::mark_opened), against the click fields.
    pub fn mark_clicked(
        &self,
        recipient_id: Uuid,
        org_id: Uuid,
        campaign_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<EngagementRecord> {
        let key = RecordKey { recipient_id, org_id, campaign_id };
        let mut bucket = self.records.get_mut(&key)?;
        let record = bucket
            .iter_mut()
            .filter(|r| r.click_time_utc.is_none())
            .max_by_key(|r| r.send_time_utc)?;
        record.click_time_utc = Some(now);
        record.click_delay_seconds = Some((now - record.send_time_utc).num_seconds());
        Some(record.clone())
    }

    pub fn records_for(&self, recipient_id: Uuid, campaign_id: Uuid) -> Vec<EngagementRecord> {
        self.records
            .iter()
            .filter(|entry| {
                entry.key().recipient_id == recipient_id && entry.key().campaign_id == campaign_id
            })
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EngagementHistory for EngagementStore {
    fn record_dispatch(&self, record: EngagementRecord) {
        let key = RecordKey {
            recipient_id: record.recipient_id,
            org_id: record.org_id,
            campaign_id: record.campaign_id,
        };
        self.records.entry(key).or_default().push(record);
    }

    fn clicks_for(&self, recipient_id: Uuid, campaign_id: Option<Uuid>) -> Vec<DateTime<Utc>> {
        let mut clicks: Vec<DateTime<Utc>> = self
            .records
            .iter()
            .filter(|entry| {
                entry.key().recipient_id == recipient_id
                    && campaign_id.map_or(true, |cid| entry.key().campaign_id == cid)
            })
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter_map(|r| r.click_time_utc)
                    .collect::<Vec<_>>()
            })
            .collect();
        clicks.sort();
        clicks
    }

    fn opens_for(&self, org_id: Uuid) -> Vec<DateTime<Utc>> {
        let mut opens: Vec<DateTime<Utc>> = self
            .records
            .iter()
            .filter(|entry| entry.key().org_id == org_id)
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter_map(|r| r.open_time_utc)
                    .collect::<Vec<_>>()
            })
            .collect();
        opens.sort();
        opens
    }
}

impl Default for EngagementStore {
    fn default() -> Self {
        Self::new()
    }
}
