use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Durable string-keyed store holding every piece of state that outlives an
/// invocation: cursors, failure ledgers and dependency error timestamps.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` when the key was never written.
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    /// Overwrites the value stored under `key`.
    async fn put(&self, key: &str, value: String) -> DomainResult<()>;
}
