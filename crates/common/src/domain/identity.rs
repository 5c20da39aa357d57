use crate::domain::{ConnectorResult, Dependency};
use async_trait::async_trait;

/// Association between an on-chain address and a contact email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub address: String,
    pub email: String,
}

/// Identity backend able to list every known address/email association.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Lists identities. Records without an address are already dropped.
    async fn fetch_identities(&self) -> ConnectorResult<Vec<IdentityRecord>>;

    /// Dependency whose error timestamp tracks this provider's health.
    fn dependency(&self) -> Dependency;
}
