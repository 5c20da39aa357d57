use crate::domain::ConnectorResult;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A templated transactional email, addressed to one or more recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub template_id: String,
    pub dynamic_data: BTreeMap<String, String>,
}

/// Transactional email provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message. Only an accepted (200/202) response is `Ok`.
    async fn send(&self, message: &EmailMessage, credential: &str) -> ConnectorResult<()>;
}

/// Source of the bearer credential presented to the mail provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> ConnectorResult<String>;
}
