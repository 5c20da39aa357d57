use crate::http::ApiState;
use common::domain::{
    Dependency, InMemoryKeyValueStore, MockAccessTokenProvider, MockIdentityProvider, MockMailer,
    MockSubgraphClient,
};
use mail_worker::{EmailTemplates, FixedClock, HealthReporter, NotificationConnectors, NotificationService};
use std::sync::Arc;

/// State whose upstreams all answer with empty data.
pub(crate) fn state_with_store(store: Arc<InMemoryKeyValueStore>) -> ApiState {
    let mut subgraph = MockSubgraphClient::new();
    subgraph.expect_created_resolutions().returning(|_| Ok(Vec::new()));
    subgraph.expect_approved_resolutions().returning(|_| Ok(Vec::new()));
    subgraph.expect_new_offers().returning(|_| Ok(Vec::new()));
    let mut identities = MockIdentityProvider::new();
    identities.expect_dependency().return_const(Dependency::Odoo);
    identities.expect_fetch_identities().returning(|| Ok(Vec::new()));

    let notifications = NotificationService::new(
        store.clone(),
        NotificationConnectors {
            subgraph: Arc::new(subgraph),
            identities: Arc::new(identities),
            mailer: Arc::new(MockMailer::new()),
            credentials: Arc::new(MockAccessTokenProvider::new()),
        },
        EmailTemplates::new(Default::default(), "https://dao.example.com"),
        Arc::new(FixedClock::at_seconds(2_000)),
    );

    ApiState {
        notifications: Arc::new(notifications),
        health: Arc::new(HealthReporter::new(store, Dependency::Odoo)),
    }
}

pub(crate) fn empty_state() -> ApiState {
    state_with_store(Arc::new(InMemoryKeyValueStore::new()))
}
