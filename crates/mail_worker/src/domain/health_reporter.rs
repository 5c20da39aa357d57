use crate::domain::{FailureLedger, NotificationKind};
use common::domain::{Dependency, KeyValueStore};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

const AUTH_UNHEALTHY: &str = "Can't fetch a mail access token. Check logs for details.";
const GRAPH_UNHEALTHY: &str = "Can't connect to graph. Check logs for details.";
const ODOO_UNHEALTHY: &str = "Can't communicate with Odoo. \
    Either login or user fetching are broken. Check the logs for more details.";
const BACKEND_UNHEALTHY: &str =
    "Can't communicate with the backend. Check the logs for more details.";

/// What a health route reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTarget {
    Auth,
    Email,
    Graph,
    /// The configured identity provider (Odoo or backend).
    Identity,
}

impl FromStr for HealthTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(HealthTarget::Auth),
            "email" => Ok(HealthTarget::Email),
            "graph" => Ok(HealthTarget::Graph),
            "odoo" | "backend" => Ok(HealthTarget::Identity),
            other => Err(format!("unknown health target: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("OK"),
            HealthStatus::Unhealthy(detail) => f.write_str(detail),
        }
    }
}

/// Answers up/down from the error timestamps and failure ledgers. Never
/// fails: a store error reads as unhealthy.
pub struct HealthReporter {
    store: Arc<dyn KeyValueStore>,
    ledger: FailureLedger,
    identity: Dependency,
}

impl HealthReporter {
    pub fn new(store: Arc<dyn KeyValueStore>, identity: Dependency) -> Self {
        Self {
            ledger: FailureLedger::new(store.clone()),
            store,
            identity,
        }
    }

    pub async fn check(&self, target: HealthTarget) -> HealthStatus {
        let status = match target {
            HealthTarget::Email => self.check_email().await,
            HealthTarget::Auth => self.check_dependency(Dependency::Auth, AUTH_UNHEALTHY).await,
            HealthTarget::Graph => self.check_dependency(Dependency::Graph, GRAPH_UNHEALTHY).await,
            HealthTarget::Identity => {
                let detail = match self.identity {
                    Dependency::Odoo => ODOO_UNHEALTHY,
                    _ => BACKEND_UNHEALTHY,
                };
                self.check_dependency(self.identity, detail).await
            }
        };
        debug!(health_target = ?target, healthy = status.is_healthy(), "health checked");
        status
    }

    async fn check_email(&self) -> HealthStatus {
        let mut unsent = 0;
        for kind in NotificationKind::ALL {
            match self.ledger.failed_ids(kind).await {
                Ok(ids) => unsent += ids.len(),
                Err(e) => {
                    error!(kind = %kind, error = %e, "failed to read failure ledger");
                    return HealthStatus::Unhealthy(format!("Can't read failed emails: {e}"));
                }
            }
        }

        if unsent == 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy(format!(
                "{unsent} emails weren't sent. Check the logs for details"
            ))
        }
    }

    async fn check_dependency(&self, dependency: Dependency, detail: &str) -> HealthStatus {
        match self.store.get(dependency.error_timestamp_key()).await {
            Ok(None) => HealthStatus::Healthy,
            Ok(Some(timestamp)) if timestamp.is_empty() => HealthStatus::Healthy,
            Ok(Some(timestamp)) => {
                debug!(dependency = %dependency, failed_at = %timestamp, "dependency unhealthy");
                HealthStatus::Unhealthy(detail.to_string())
            }
            Err(e) => {
                error!(dependency = %dependency, error = %e, "failed to read error timestamp");
                HealthStatus::Unhealthy(detail.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeferredWrites, DependencyMonitor, FixedClock};
    use common::domain::{
        ConnectorError, DomainError, InMemoryKeyValueStore, MockKeyValueStore,
    };

    #[tokio::test]
    async fn test_failure_then_success_is_healthy() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let reporter = HealthReporter::new(store.clone(), Dependency::Odoo);
        let monitor = DependencyMonitor::new(Arc::new(FixedClock::at_seconds(1_000)));

        let writes = DeferredWrites::new();
        let _: Option<()> = monitor.observe(Dependency::Graph, Err(ConnectorError::FalseResult), &writes);
        writes.flush(store.as_ref()).await.unwrap();
        assert!(!reporter.check(HealthTarget::Graph).await.is_healthy());

        let writes = DeferredWrites::new();
        monitor.observe(Dependency::Graph, Ok(()), &writes);
        writes.flush(store.as_ref()).await.unwrap();
        assert_eq!(reporter.check(HealthTarget::Graph).await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_email_health_counts_every_ledger() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([
            ("notEmailedResolutionIds", r#"["1"]"#),
            ("notEmailedVotingResolutionIds", "[]"),
            ("notEmailedVotingStartResolutionIds", r#"[{"id":"2"},{"id":"3"}]"#),
            ("notEmailedOfferIds", r#"[{"id":"o1","from":"0xA","amount":"1","createTimestamp":"1"}]"#),
        ]));
        let reporter = HealthReporter::new(store, Dependency::Odoo);

        assert_eq!(
            reporter.check(HealthTarget::Email).await,
            HealthStatus::Unhealthy("4 emails weren't sent. Check the logs for details".to_string())
        );
    }

    #[tokio::test]
    async fn test_identity_health_uses_configured_provider() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([
            ("odooErrorTimestamp", "1700000000000"),
            ("backendErrorTimestamp", ""),
        ]));

        let backend = HealthReporter::new(store.clone(), Dependency::Backend);
        assert!(backend.check(HealthTarget::Identity).await.is_healthy());

        let odoo = HealthReporter::new(store, Dependency::Odoo);
        assert_eq!(
            odoo.check(HealthTarget::Identity).await,
            HealthStatus::Unhealthy(
                "Can't communicate with Odoo. Either login or user fetching are broken. \
                 Check the logs for more details."
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_unhealthy_messages_per_dependency() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([
            ("authErrorTimestamp", "1"),
            ("graphErrorTimestamp", "1"),
            ("backendErrorTimestamp", "1"),
        ]));
        let reporter = HealthReporter::new(store, Dependency::Backend);

        assert_eq!(
            reporter.check(HealthTarget::Auth).await.to_string(),
            "Can't fetch a mail access token. Check logs for details."
        );
        assert_eq!(
            reporter.check(HealthTarget::Graph).await.to_string(),
            "Can't connect to graph. Check logs for details."
        );
        assert_eq!(
            reporter.check(HealthTarget::Identity).await.to_string(),
            "Can't communicate with the backend. Check the logs for more details."
        );
    }

    #[tokio::test]
    async fn test_store_error_reads_as_unhealthy() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(DomainError::StoreError("bucket gone".to_string())));
        let reporter = HealthReporter::new(Arc::new(store), Dependency::Odoo);

        assert!(!reporter.check(HealthTarget::Auth).await.is_healthy());
        assert!(!reporter.check(HealthTarget::Email).await.is_healthy());
    }

    #[test]
    fn test_backend_route_aliases_identity() {
        assert_eq!("backend".parse::<HealthTarget>(), Ok(HealthTarget::Identity));
        assert_eq!("odoo".parse::<HealthTarget>(), Ok(HealthTarget::Identity));
        assert!("mail".parse::<HealthTarget>().is_err());
    }
}
