//! Delivery queue abstraction and its in-memory development implementation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use smartreach_core::types::ScheduledJob;
use smartreach_core::SmartReachResult;
use tracing::info;
use uuid::Uuid;

/// Returned once a job is accepted. Acceptance is fire-and-forget relative
/// to actual mail delivery.
#[derive(Debug, Clone)]
pub struct SubmitAck {
    pub dedup_key: String,
    pub eta_utc: DateTime<Utc>,
}

/// Mail-transport seam: accepts a scheduled job and eventually sends it.
pub trait DeliveryQueue: Send + Sync {
    fn submit(&self, job: ScheduledJob) -> SmartReachResult<SubmitAck>;

    /// Withdraw a pending job by its `(campaign, recipient)` handle, for
    /// campaigns edited or halted after submission. Returns whether a job
    /// was actually pending.
    fn cancel(&self, campaign_id: Uuid, recipient_email: &str) -> bool;
}

/// In-memory queue keyed by dedup key. A re-submitted key replaces the
/// pending job instead of duplicating it, which keeps the at-least-once
/// contract from producing double sends.
///
/// Production: replace with a durable broker (e.g. NATS JetStream) behind
/// the same trait.
pub struct InMemoryDeliveryQueue {
    jobs: DashMap<String, ScheduledJob>,
}

impl InMemoryDeliveryQueue {
    pub fn new() -> Self {
        Self { jobs: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, dedup_key: &str) -> Option<ScheduledJob> {
        self.jobs.get(dedup_key).map(|j| j.value().clone())
    }

    pub fn pending_for(&self, campaign_id: Uuid) -> Vec<ScheduledJob> {
        let mut jobs: Vec<ScheduledJob> = self
            .jobs
            .iter()
            .filter(|j| j.campaign_id == campaign_id)
            .map(|j| j.value().clone())
            .collect();
        jobs.sort_by(|a, b| a.recipient_email.cmp(&b.recipient_email));
        jobs
    }
}

impl DeliveryQueue for InMemoryDeliveryQueue {
    fn submit(&self, job: ScheduledJob) -> SmartReachResult<SubmitAck> {
        let ack = SubmitAck {
            dedup_key: job.dedup_key.clone(),
            eta_utc: job.eta_utc,
        };
        self.jobs.insert(job.dedup_key.clone(), job);
        Ok(ack)
    }

    fn cancel(&self, campaign_id: Uuid, recipient_email: &str) -> bool {
        let key = ScheduledJob::dedup_key(campaign_id, recipient_email);
        let removed = self.jobs.remove(&key).is_some();
        if removed {
            info!(%campaign_id, recipient_email, "pending job cancelled");
        }
        removed
    }
}

impl Default for InMemoryDeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}
