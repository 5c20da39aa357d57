use crate::domain::{ConnectorResult, Offer, Resolution};
use async_trait::async_trait;

/// Read access to the blockchain index.
///
/// Every query returns items ordered ascending by the timestamp it filters on.
/// Timestamps are passed through as decimal strings of seconds since epoch.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SubgraphClient: Send + Sync {
    /// Resolutions with `createTimestamp > created_after`.
    async fn created_resolutions(&self, created_after: &str) -> ConnectorResult<Vec<Resolution>>;

    /// Resolutions with `approveTimestamp > approved_after`, including their
    /// resolution type.
    async fn approved_resolutions(&self, approved_after: &str)
        -> ConnectorResult<Vec<Resolution>>;

    /// Offers with `createTimestamp > created_after`.
    async fn new_offers(&self, created_after: &str) -> ConnectorResult<Vec<Offer>>;
}
