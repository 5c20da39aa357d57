use crate::domain::{DomainError, DomainResult, KeyValueStore};
use async_nats::jetstream::kv;
use async_trait::async_trait;
use tracing::{instrument, trace};

/// KeyValueStore backed by a NATS JetStream key-value bucket.
pub struct NatsKeyValueStore {
    bucket: String,
    store: kv::Store,
}

impl NatsKeyValueStore {
    pub fn new(bucket: impl Into<String>, store: kv::Store) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl KeyValueStore for NatsKeyValueStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let entry = self
            .store
            .get(key)
            .await
            .map_err(|e| DomainError::StoreError(format!("failed to read {key}: {e}")))?;

        match entry {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    DomainError::SerializationError(key.to_string(), e.to_string())
                })?;
                trace!(size = value.len(), "read key");
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value), fields(bucket = %self.bucket, size = value.len()))]
    async fn put(&self, key: &str, value: String) -> DomainResult<()> {
        self.store
            .put(key, value.into())
            .await
            .map_err(|e| DomainError::StoreError(format!("failed to write {key}: {e}")))?;
        Ok(())
    }
}
