//! Collaborator interface for the engagement history store.

use crate::types::EngagementRecord;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read/append access to engagement records. The estimator reads click
/// history through this seam; the scheduler appends one record per dispatch.
pub trait EngagementHistory: Send + Sync {
    /// Create the record for one dispatch attempt, `send_time_utc` populated.
    fn record_dispatch(&self, record: EngagementRecord);

    /// Click instants for a recipient, ascending. `campaign_id` narrows the
    /// scope to one campaign; `None` spans all campaigns.
    fn clicks_for(&self, recipient_id: Uuid, campaign_id: Option<Uuid>) -> Vec<DateTime<Utc>>;

    /// Open instants across an organization, ascending.
    fn opens_for(&self, org_id: Uuid) -> Vec<DateTime<Utc>>;
}
