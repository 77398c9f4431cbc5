//! Dispatch scheduling — fans recipients out over a bounded worker pool,
//! submitting exactly one delivery job per recipient.

use crate::estimator::OptimalTimeEstimator;
use crate::personalize::Personalizer;
use crate::queue::DeliveryQueue;
use crate::window::CampaignWindow;
use smartreach_core::history::EngagementHistory;
use smartreach_core::types::{
    Campaign, EngagementRecord, Organization, Recipient, ScheduleFailure, ScheduleOutcome,
    ScheduledJob,
};
use smartreach_core::{SmartReachError, SmartReachResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Everything one scheduling request needs, carried explicitly so concurrent
/// requests from different organizations never observe each other's state.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    pub organization: Organization,
    pub campaign: Campaign,
    pub recipients: Vec<Recipient>,
    /// Overrides the organization's landing link for this run.
    pub link: Option<String>,
}

pub struct DispatchScheduler {
    estimator: Arc<OptimalTimeEstimator>,
    history: Arc<dyn EngagementHistory>,
    queue: Arc<dyn DeliveryQueue>,
    max_workers: usize,
    default_link: String,
}

impl DispatchScheduler {
    pub fn new(
        estimator: Arc<OptimalTimeEstimator>,
        history: Arc<dyn EngagementHistory>,
        queue: Arc<dyn DeliveryQueue>,
        max_workers: usize,
        default_link: String,
    ) -> Self {
        Self {
            estimator,
            history,
            queue,
            max_workers: max_workers.max(1),
            default_link,
        }
    }

    /// Schedule every recipient in the context. One recipient's failure is
    /// recorded in the outcome instead of aborting the batch; the call
    /// returns once all jobs are accepted by the queue, not once mail is
    /// sent.
    pub async fn schedule_campaign(&self, ctx: ScheduleContext) -> SmartReachResult<ScheduleOutcome> {
        let window = CampaignWindow::new(ctx.campaign.start_utc, ctx.campaign.end_utc)?;

        if ctx.recipients.is_empty() {
            return Err(SmartReachError::Validation(format!(
                "no recipients registered for organization {}",
                ctx.organization.id
            )));
        }

        let link = ctx
            .link
            .or_else(|| ctx.organization.company_link.clone())
            .unwrap_or_else(|| self.default_link.clone());
        let campaign = Arc::new(ctx.campaign);
        let org_name = Arc::new(ctx.organization.name);
        let recipient_count = ctx.recipients.len();

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        // Task id → email, so even a panicked task yields an attributable
        // failure entry.
        let mut task_emails: HashMap<tokio::task::Id, String> = HashMap::new();

        for recipient in ctx.recipients {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(anyhow::Error::from)?;
            let estimator = self.estimator.clone();
            let history = self.history.clone();
            let queue = self.queue.clone();
            let campaign = campaign.clone();
            let org_name = org_name.clone();
            let link = link.clone();
            let task_email = recipient.email.clone();

            let handle = tasks.spawn(async move {
                let _permit = permit;
                let email = recipient.email.clone();
                let result = dispatch_one(
                    &estimator, &*history, &*queue, &campaign, &org_name, &link, recipient, &window,
                );
                (email, result)
            });
            task_emails.insert(handle.id(), task_email);
        }

        let mut outcome = ScheduleOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((email, Ok(eta))) => {
                    outcome.scheduled.insert(email, eta);
                }
                Ok((email, Err(e))) => {
                    warn!(recipient_email = %email, error = %e, "recipient dispatch failed");
                    metrics::counter!("scheduler.recipient_failures").increment(1);
                    outcome.failures.push(ScheduleFailure {
                        recipient_email: email,
                        reason: e.to_string(),
                    });
                }
                Err(join_error) => {
                    let email = task_emails
                        .get(&join_error.id())
                        .cloned()
                        .unwrap_or_default();
                    warn!(recipient_email = %email, error = %join_error, "dispatch task aborted");
                    metrics::counter!("scheduler.recipient_failures").increment(1);
                    outcome.failures.push(ScheduleFailure {
                        recipient_email: email,
                        reason: format!("dispatch task aborted: {join_error}"),
                    });
                }
            }
        }

        info!(
            campaign_id = %campaign.id,
            scheduled = outcome.scheduled.len(),
            failed = outcome.failures.len(),
            recipients = recipient_count,
            "campaign scheduling complete"
        );
        metrics::counter!("scheduler.jobs_submitted").increment(outcome.scheduled.len() as u64);

        Ok(outcome)
    }
}

/// Personalize, estimate, submit one job, and open the engagement record.
#[allow(clippy::too_many_arguments)]
fn dispatch_one(
    estimator: &OptimalTimeEstimator,
    history: &dyn EngagementHistory,
    queue: &dyn DeliveryQueue,
    campaign: &Campaign,
    org_name: &str,
    link: &str,
    recipient: Recipient,
    window: &CampaignWindow,
) -> SmartReachResult<chrono::DateTime<chrono::Utc>> {
    let body = Personalizer::new()
        .var("company_name", org_name)
        .var("recipient_name", &recipient.first_name)
        .render(&campaign.body);

    let eta = estimator.optimal_send_time(recipient.id, campaign.id, window);

    let job = ScheduledJob {
        campaign_id: campaign.id,
        recipient_email: recipient.email.clone(),
        subject: campaign.subject.clone(),
        body,
        link: link.to_string(),
        eta_utc: eta,
        dedup_key: ScheduledJob::dedup_key(campaign.id, &recipient.email),
    };

    let ack = queue
        .submit(job)
        .map_err(|e| SmartReachError::Dispatch(e.to_string()))?;

    history.record_dispatch(EngagementRecord::new(
        recipient.id,
        recipient.org_id,
        campaign.id,
        ack.eta_utc,
    ));

    Ok(ack.eta_utc)
}
