use crate::domain::{DeferredWrites, NotificationKind};
use common::domain::{DomainError, DomainResult, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-kind slot holding the entities whose notification failed in the most
/// recent attempt.
///
/// The ledger is always replaced as a whole. Removing an entry means writing
/// back the recomputed "still failed" subset.
pub struct FailureLedger {
    store: Arc<dyn KeyValueStore>,
}

impl FailureLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Entities recorded for `kind`; empty when never written or `null`.
    ///
    /// Entries stored as bare id strings are read as `{"id": ...}`. A batch
    /// that cannot be decoded is dropped with a warning.
    pub async fn read<T: DeserializeOwned>(
        &self,
        kind: NotificationKind,
        writes: &DeferredWrites,
    ) -> DomainResult<Vec<T>> {
        let Some(entries) = self.read_entries(kind, writes).await? else {
            return Ok(Vec::new());
        };

        let decoded = entries
            .into_iter()
            .map(|entry| match entry {
                Value::String(id) => serde_json::from_value(serde_json::json!({ "id": id })),
                other => serde_json::from_value(other),
            })
            .collect::<Result<Vec<T>, _>>();

        match decoded {
            Ok(entities) => {
                debug!(kind = %kind, count = entities.len(), "read failure ledger");
                Ok(entities)
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "discarding undecodable failure ledger");
                Ok(Vec::new())
            }
        }
    }

    /// Overwrites the ledger for `kind`, even with an empty batch.
    pub fn write<T: Serialize>(
        &self,
        kind: NotificationKind,
        entities: &[T],
        writes: &DeferredWrites,
    ) -> DomainResult<()> {
        let serialized = serde_json::to_string(entities).map_err(|e| {
            DomainError::SerializationError(kind.ledger_key().to_string(), e.to_string())
        })?;
        debug!(kind = %kind, count = entities.len(), "replacing failure ledger");
        writes.schedule(kind.ledger_key(), serialized);
        Ok(())
    }

    /// Ids recorded for `kind`, whatever the entity type.
    pub async fn failed_ids(&self, kind: NotificationKind) -> DomainResult<Vec<String>> {
        let no_pending = DeferredWrites::new();
        let entries = self.read_entries(kind, &no_pending).await?.unwrap_or_default();

        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(id) => Some(id),
                Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect())
    }

    async fn read_entries(
        &self,
        kind: NotificationKind,
        writes: &DeferredWrites,
    ) -> DomainResult<Option<Vec<Value>>> {
        let Some(raw) = writes.read(self.store.as_ref(), kind.ledger_key()).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Option<Vec<Value>>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(kind = %kind, error = %e, "failure ledger is not a JSON list");
                Ok(None)
            }
        }
    }
}
