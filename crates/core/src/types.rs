//! Domain types — organizations, campaigns, recipients, engagement records,
//! and the dispatch job handed to the delivery queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A sending organization. Supplies the authoring timezone for campaign
/// windows and the landing link embedded in tracked mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// IANA zone name used to interpret campaign-authoring local times.
    pub timezone: String,
    pub company_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An email campaign. Authored externally; read-only to the dispatch core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub description: String,
    pub subject: String,
    pub body: String,
    /// Start of the valid send window. Invariant: `end_utc > start_utc`.
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Active,
    Completed,
    Halted,
}

/// A campaign recipient. Imported externally; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Uuid,
    pub org_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Persisted evidence of one dispatch and its subsequent open/click events.
///
/// One record is created per (recipient, campaign) dispatch attempt, with
/// `send_time_utc` populated and everything else null. Append-only after
/// that: each timestamp/delay pair transitions null→set exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub send_time_utc: DateTime<Utc>,
    pub open_time_utc: Option<DateTime<Utc>>,
    pub click_time_utc: Option<DateTime<Utc>>,
    pub open_delay_seconds: Option<i64>,
    pub click_delay_seconds: Option<i64>,
}

impl EngagementRecord {
    pub fn new(
        recipient_id: Uuid,
        org_id: Uuid,
        campaign_id: Uuid,
        send_time_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            org_id,
            campaign_id,
            send_time_utc,
            open_time_utc: None,
            click_time_utc: None,
            open_delay_seconds: None,
            click_delay_seconds: None,
        }
    }

    pub fn is_opened(&self) -> bool {
        self.open_time_utc.is_some()
    }

    pub fn is_clicked(&self) -> bool {
        self.click_time_utc.is_some()
    }
}

/// The unit submitted to the delivery queue for one recipient.
/// Ephemeral: not persisted by this core beyond the hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub campaign_id: Uuid,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub link: String,
    pub eta_utc: DateTime<Utc>,
    pub dedup_key: String,
}

impl ScheduledJob {
    /// Stable submission/cancellation key for one recipient of one campaign.
    pub fn dedup_key(campaign_id: Uuid, recipient_email: &str) -> String {
        format!("{campaign_id}:{recipient_email}")
    }
}

/// Which click history the estimator learns from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryScope {
    /// A recipient's clicks across all campaigns (default; output shifts as
    /// new campaigns accrue history).
    AllCampaigns,
    /// Only clicks recorded against the campaign being scheduled.
    CurrentCampaign,
}

impl Default for HistoryScope {
    fn default() -> Self {
        HistoryScope::AllCampaigns
    }
}

/// Per-recipient result set of one scheduling invocation. One recipient's
/// failure never aborts the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    /// recipient email → accepted send instant.
    pub scheduled: BTreeMap<String, DateTime<Utc>>,
    pub failures: Vec<ScheduleFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleFailure {
    pub recipient_email: String,
    pub reason: String,
}
