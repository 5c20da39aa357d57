use crate::domain::{Clock, DeferredWrites};
use common::domain::{ConnectorResult, Dependency};
use std::sync::Arc;
use tracing::{error, trace};

/// Records the outcome of every upstream call in the dependency's error
/// timestamp: empty on success, epoch milliseconds of the failure otherwise.
pub struct DependencyMonitor {
    clock: Arc<dyn Clock>,
}

impl DependencyMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Schedules the error timestamp update for `dependency` and converts the
    /// result into "payload or unavailable".
    pub fn observe<T>(
        &self,
        dependency: Dependency,
        result: ConnectorResult<T>,
        writes: &DeferredWrites,
    ) -> Option<T> {
        match result {
            Ok(payload) => {
                trace!(dependency = %dependency, "upstream call succeeded");
                writes.schedule(dependency.error_timestamp_key(), "");
                Some(payload)
            }
            Err(e) => {
                error!(dependency = %dependency, error = %e, "upstream call failed");
                let failed_at = self.clock.now().timestamp_millis().to_string();
                writes.schedule(dependency.error_timestamp_key(), failed_at);
                None
            }
        }
    }
}
