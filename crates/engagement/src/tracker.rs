//! Open/click event ingestion — correlates anonymous beacon and redirect
//! hits back to engagement records.

use crate::store::EngagementStore;
use smartreach_core::clock::Clock;
use smartreach_core::directory::Directory;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// Transport-level acknowledgement for an open beacon. `tracked` is
/// diagnostic only: the caller-facing response succeeds either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenAck {
    pub tracked: bool,
}

/// Result of a click hit. The redirect is always populated; tracking failure
/// never blocks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub tracked: bool,
    pub redirect_url: String,
}

pub struct EngagementTracker {
    directory: Arc<Directory>,
    store: Arc<EngagementStore>,
    clock: Arc<dyn Clock>,
    default_link: String,
}

impl EngagementTracker {
    pub fn new(
        directory: Arc<Directory>,
        store: Arc<EngagementStore>,
        clock: Arc<dyn Clock>,
        default_link: String,
    ) -> Self {
        Self { directory, store, clock, default_link }
    }

    /// Ingest an open beacon hit. Unknown recipients and already-opened
    /// records are logged and dropped; the acknowledgement still succeeds.
    pub fn track_open(&self, recipient_email: &str, org_id: Uuid, campaign_id: Uuid) -> OpenAck {
        let Some(recipient) = self.directory.recipient_by_email(org_id, recipient_email) else {
            warn!(recipient_email, %org_id, "open beacon for unknown recipient");
            metrics::counter!("tracker.unmatched_opens").increment(1);
            return OpenAck { tracked: false };
        };

        match self
            .store
            .mark_opened(recipient.id, org_id, campaign_id, self.clock.now())
        {
            Some(record) => {
                info!(
                    recipient_email,
                    %campaign_id,
                    delay_seconds = record.open_delay_seconds,
                    "email open tracked"
                );
                metrics::counter!("tracker.opens").increment(1);
                OpenAck { tracked: true }
            }
            None => {
                warn!(recipient_email, %campaign_id, "no unopened engagement found");
                metrics::counter!("tracker.unmatched_opens").increment(1);
                OpenAck { tracked: false }
            }
        }
    }

    /// Ingest a click hit. The caller is always given a redirect target: the
    /// supplied link when it parses as a URL, the configured default
    /// otherwise.
    pub fn track_click(
        &self,
        recipient_email: &str,
        org_id: Uuid,
        campaign_id: Uuid,
        redirect_url: Option<&str>,
    ) -> ClickOutcome {
        let redirect_url = redirect_url
            .filter(|candidate| Url::parse(candidate).is_ok())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_link.clone());

        let Some(recipient) = self.directory.recipient_by_email(org_id, recipient_email) else {
            warn!(recipient_email, %org_id, "click for unknown recipient");
            metrics::counter!("tracker.unmatched_clicks").increment(1);
            return ClickOutcome { tracked: false, redirect_url };
        };

        match self
            .store
            .mark_clicked(recipient.id, org_id, campaign_id, self.clock.now())
        {
            Some(record) => {
                info!(
                    recipient_email,
                    %campaign_id,
                    delay_seconds = record.click_delay_seconds,
                    "email click tracked"
                );
                metrics::counter!("tracker.clicks").increment(1);
                ClickOutcome { tracked: true, redirect_url }
            }
            None => {
                warn!(recipient_email, %campaign_id, "no unclicked engagement found");
                metrics::counter!("tracker.unmatched_clicks").increment(1);
                ClickOutcome { tracked: false, redirect_url }
            }
        }
    }
}
