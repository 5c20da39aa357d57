use chrono::DateTime;
use common::domain::{ConnectorError, ConnectorResult, EmailMessage, Offer, Resolution};
use std::collections::BTreeMap;

pub const DEFAULT_PRE_DRAFT_TEMPLATE_ID: &str = "d-4ca5e4b4a7804f08b81055d98200b1af";
pub const DEFAULT_RESOLUTION_APPROVED_TEMPLATE_ID: &str = "d-0edd2029edd0443583617bf0d9151930";
pub const DEFAULT_VOTING_STARTS_TEMPLATE_ID: &str = "d-c2de24efba85473582d9f5542b1996ac";

/// Provider template id per notification kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateIds {
    pub pre_draft: String,
    pub resolution_approved: String,
    pub voting_starts: String,
    pub new_offer: String,
}

impl Default for TemplateIds {
    fn default() -> Self {
        Self {
            pre_draft: DEFAULT_PRE_DRAFT_TEMPLATE_ID.to_string(),
            resolution_approved: DEFAULT_RESOLUTION_APPROVED_TEMPLATE_ID.to_string(),
            voting_starts: DEFAULT_VOTING_STARTS_TEMPLATE_ID.to_string(),
            new_offer: String::new(),
        }
    }
}

/// Builds the templated messages; links point into the DAO web app.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    ids: TemplateIds,
    dao_url: String,
}

impl EmailTemplates {
    pub fn new(ids: TemplateIds, dao_url: impl Into<String>) -> Self {
        let dao_url = dao_url.into().trim_end_matches('/').to_string();
        Self { ids, dao_url }
    }

    /// Asks the creator to finish the draft. Only the first recipient is addressed.
    pub fn pre_draft(&self, resolution: &Resolution, recipients: Vec<String>) -> EmailMessage {
        EmailMessage {
            to: recipients.into_iter().take(1).collect(),
            template_id: self.ids.pre_draft.clone(),
            dynamic_data: BTreeMap::from([(
                "resolutionUrl".to_string(),
                format!("{}/resolutions/{}/edit", self.dao_url, resolution.id),
            )]),
        }
    }

    /// Announces when voting opens. Fails when the start cannot be determined.
    pub fn resolution_approved(
        &self,
        resolution: &Resolution,
        recipients: Vec<String>,
    ) -> ConnectorResult<EmailMessage> {
        let voting_starts = resolution
            .voting_starts_seconds()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .ok_or_else(|| {
                ConnectorError::InvalidResponse(format!(
                    "resolution {} has no voting start",
                    resolution.id
                ))
            })?;

        Ok(EmailMessage {
            to: recipients,
            template_id: self.ids.resolution_approved.clone(),
            dynamic_data: BTreeMap::from([
                (
                    "votingStartsString".to_string(),
                    voting_starts.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
                ),
                ("resolutionUrl".to_string(), self.resolution_url(resolution)),
            ]),
        })
    }

    pub fn voting_starts(&self, resolution: &Resolution, recipients: Vec<String>) -> EmailMessage {
        EmailMessage {
            to: recipients,
            template_id: self.ids.voting_starts.clone(),
            dynamic_data: BTreeMap::from([
                ("resolutionNumber".to_string(), resolution.id.clone()),
                ("resolutionUrl".to_string(), self.resolution_url(resolution)),
            ]),
        }
    }

    pub fn new_offer(&self, offer: &Offer, recipients: Vec<String>) -> EmailMessage {
        EmailMessage {
            to: recipients,
            template_id: self.ids.new_offer.clone(),
            dynamic_data: BTreeMap::from([
                ("amount".to_string(), offer.amount.clone()),
                ("offerUrl".to_string(), format!("{}/tokens", self.dao_url)),
            ]),
        }
    }

    fn resolution_url(&self, resolution: &Resolution) -> String {
        format!("{}/resolutions/{}", self.dao_url, resolution.id)
    }
}
