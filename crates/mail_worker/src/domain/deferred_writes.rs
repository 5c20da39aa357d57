use common::domain::{DomainError, DomainResult, KeyValueStore};
use std::sync::Mutex;
use tracing::{debug, error};

/// Key-value writes scheduled during one invocation.
///
/// Connectors and core components never write to the store directly; they
/// schedule writes here and the invocation flushes them, in scheduling order,
/// before it reports completion. Reads made through [`DeferredWrites::read`]
/// see the latest pending value for a key.
#[derive(Debug, Default)]
pub struct DeferredWrites {
    pending: Mutex<Vec<(String, String)>>,
}

impl DeferredWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        debug!(key = %key, "scheduling write");
        self.lock().push((key, value));
    }

    /// Latest value scheduled for `key`, if any.
    pub fn pending_value(&self, key: &str) -> Option<String> {
        self.lock()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Read-your-writes lookup: the pending value if one is scheduled,
    /// otherwise whatever the store holds.
    pub async fn read(&self, store: &dyn KeyValueStore, key: &str) -> DomainResult<Option<String>> {
        if let Some(value) = self.pending_value(key) {
            return Ok(Some(value));
        }
        store.get(key).await
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Writes every pending entry in order. All entries are attempted even
    /// when one fails; the first failure is returned.
    pub async fn flush(&self, store: &dyn KeyValueStore) -> DomainResult<usize> {
        let pending = std::mem::take(&mut *self.lock());
        let total = pending.len();
        let mut first_error: Option<DomainError> = None;

        for (key, value) in pending {
            if let Err(e) = store.put(&key, value).await {
                error!(key = %key, error = %e, "failed to flush deferred write");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(count = total, "flushed deferred writes");
                Ok(total)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
