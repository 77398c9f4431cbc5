//! In-memory organization/campaign/recipient directory backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store.
//! This provides the same API surface for development and testing.

use crate::error::{SmartReachError, SmartReachResult};
use crate::types::{Campaign, CampaignStatus, Organization, Recipient};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

/// Thread-safe directory of the external entities the dispatch core reads:
/// organizations, their campaigns, and their recipient lists.
pub struct Directory {
    organizations: DashMap<Uuid, Organization>,
    campaigns: DashMap<Uuid, Campaign>,
    recipients: DashMap<Uuid, Recipient>,
}

impl Directory {
    pub fn new() -> Self {
        info!("Directory initialized (in-memory, development mode)");
        Self {
            organizations: DashMap::new(),
            campaigns: DashMap::new(),
            recipients: DashMap::new(),
        }
    }

    // ─── Organizations ─────────────────────────────────────────────────────

    pub fn create_organization(
        &self,
        name: String,
        timezone: String,
        company_link: Option<String>,
    ) -> Organization {
        let org = Organization {
            id: Uuid::new_v4(),
            name,
            timezone,
            company_link,
            created_at: Utc::now(),
        };
        self.organizations.insert(org.id, org.clone());
        org
    }

    pub fn get_organization(&self, id: Uuid) -> SmartReachResult<Organization> {
        self.organizations
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| SmartReachError::NotFound("organization", id.to_string()))
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn create_campaign(
        &self,
        org_id: Uuid,
        name: String,
        description: String,
        subject: String,
        body: String,
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
    ) -> Campaign {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            org_id,
            name,
            description,
            subject,
            body,
            start_utc,
            end_utc,
            status: CampaignStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    pub fn get_campaign(&self, id: Uuid) -> SmartReachResult<Campaign> {
        self.campaigns
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| SmartReachError::NotFound("campaign", id.to_string()))
    }

    pub fn set_campaign_status(&self, id: Uuid, status: CampaignStatus) -> SmartReachResult<()> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| SmartReachError::NotFound("campaign", id.to_string()))?;
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(())
    }

    pub fn campaigns_for(&self, org_id: Uuid) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|r| r.org_id == org_id)
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    // ─── Recipients ────────────────────────────────────────────────────────

    /// Register a recipient. Duplicate emails within one organization are
    /// rejected.
    pub fn add_recipient(
        &self,
        org_id: Uuid,
        email: String,
        first_name: String,
        last_name: String,
        location: Option<String>,
        timezone: Option<String>,
    ) -> SmartReachResult<Recipient> {
        if self.recipient_by_email(org_id, &email).is_some() {
            return Err(SmartReachError::Validation(format!(
                "recipient with email {email} already exists"
            )));
        }
        let recipient = Recipient {
            id: Uuid::new_v4(),
            org_id,
            email,
            first_name,
            last_name,
            location,
            timezone,
            joined_at: Utc::now(),
        };
        self.recipients.insert(recipient.id, recipient.clone());
        Ok(recipient)
    }

    pub fn recipients_for(&self, org_id: Uuid) -> Vec<Recipient> {
        let mut recipients: Vec<Recipient> = self
            .recipients
            .iter()
            .filter(|r| r.org_id == org_id)
            .map(|r| r.value().clone())
            .collect();
        recipients.sort_by(|a, b| a.email.cmp(&b.email));
        recipients
    }

    pub fn recipient_by_email(&self, org_id: Uuid, email: &str) -> Option<Recipient> {
        self.recipients
            .iter()
            .find(|r| r.org_id == org_id && r.email == email)
            .map(|r| r.value().clone())
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_recipient_email_rejected() {
        let dir = Directory::new();
        let org = dir.create_organization("Acme".into(), "UTC".into(), None);
        dir.add_recipient(org.id, "a@acme.test".into(), "Ada".into(), "L".into(), None, None)
            .unwrap();
        let err = dir
            .add_recipient(org.id, "a@acme.test".into(), "Ada".into(), "L".into(), None, None)
            .unwrap_err();
        assert!(matches!(err, SmartReachError::Validation(_)));
    }

    #[test]
    fn test_recipients_sorted_by_email() {
        let dir = Directory::new();
        let org = dir.create_organization("Acme".into(), "UTC".into(), None);
        for email in ["c@x.test", "a@x.test", "b@x.test"] {
            dir.add_recipient(org.id, email.into(), "F".into(), "L".into(), None, None)
                .unwrap();
        }
        let emails: Vec<String> = dir.recipients_for(org.id).into_iter().map(|r| r.email).collect();
        assert_eq!(emails, vec!["a@x.test", "b@x.test", "c@x.test"]);
    }

    #[test]
    fn test_missing_campaign_is_not_found() {
        let dir = Directory::new();
        assert!(matches!(
            dir.get_campaign(Uuid::new_v4()),
            Err(SmartReachError::NotFound("campaign", _))
        ));
    }
}
