use crate::domain::{DeferredWrites, DependencyMonitor};
use common::domain::{
    ConnectorResult, Dependency, DomainError, DomainResult, KeyValueStore, Offer, Resolution,
    SubgraphClient,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Cursor value used when a feed has never been polled.
pub const INITIAL_CURSOR: &str = "0";

/// Subgraph feeds polled with a persisted high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    CreatedResolutions,
    ApprovedResolutions,
    Offers,
}

impl Feed {
    pub fn cursor_key(&self) -> &'static str {
        match self {
            Feed::CreatedResolutions => "lastCreateTimestamp",
            Feed::ApprovedResolutions => "lastApprovedTimestamp",
            Feed::Offers => "lastFetchedOfferTimestamp",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feed::CreatedResolutions => "created_resolutions",
            Feed::ApprovedResolutions => "approved_resolutions",
            Feed::Offers => "offers",
        };
        f.write_str(name)
    }
}

/// Polls subgraph feeds so that each item is returned once.
///
/// The subgraph returns items ascending by the filtered timestamp. After a
/// non-empty fetch the cursor moves to the last item's timestamp; it is
/// never re-sorted and never moved backwards. A failed fetch yields an empty
/// list, same as "nothing new".
pub struct CursorTracker {
    store: Arc<dyn KeyValueStore>,
    subgraph: Arc<dyn SubgraphClient>,
    monitor: Arc<DependencyMonitor>,
}

impl CursorTracker {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        subgraph: Arc<dyn SubgraphClient>,
        monitor: Arc<DependencyMonitor>,
    ) -> Self {
        Self {
            store,
            subgraph,
            monitor,
        }
    }

    #[instrument(skip(self, writes))]
    pub async fn fetch_created_resolutions(
        &self,
        writes: &DeferredWrites,
    ) -> DomainResult<Vec<Resolution>> {
        self.fetch_new(
            Feed::CreatedResolutions,
            writes,
            |cursor| async move { self.subgraph.created_resolutions(&cursor).await },
            |resolution: &Resolution| resolution.create_timestamp.as_deref(),
        )
        .await
    }

    /// Newly approved resolutions with `voting_starts` filled in.
    #[instrument(skip(self, writes))]
    pub async fn fetch_approved_resolutions(
        &self,
        writes: &DeferredWrites,
    ) -> DomainResult<Vec<Resolution>> {
        let resolutions = self
            .fetch_new(
                Feed::ApprovedResolutions,
                writes,
                |cursor| async move { self.subgraph.approved_resolutions(&cursor).await },
                |resolution: &Resolution| resolution.approve_timestamp.as_deref(),
            )
            .await?;

        Ok(resolutions
            .into_iter()
            .map(Resolution::with_computed_voting_starts)
            .collect())
    }

    #[instrument(skip(self, writes))]
    pub async fn fetch_new_offers(&self, writes: &DeferredWrites) -> DomainResult<Vec<Offer>> {
        self.fetch_new(
            Feed::Offers,
            writes,
            |cursor| async move { self.subgraph.new_offers(&cursor).await },
            |offer: &Offer| Some(offer.create_timestamp.as_str()),
        )
        .await
    }

    /// Current cursor of `feed`, including a pending advance.
    pub async fn cursor(&self, feed: Feed, writes: &DeferredWrites) -> DomainResult<String> {
        let key = feed.cursor_key();
        let cursor = writes
            .read(self.store.as_ref(), key)
            .await?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| INITIAL_CURSOR.to_string());

        parse_seconds(key, &cursor)?;
        Ok(cursor)
    }

    async fn fetch_new<T, Q, Fut, K>(
        &self,
        feed: Feed,
        writes: &DeferredWrites,
        query: Q,
        timestamp_of: K,
    ) -> DomainResult<Vec<T>>
    where
        Q: FnOnce(String) -> Fut,
        Fut: std::future::Future<Output = ConnectorResult<Vec<T>>>,
        K: Fn(&T) -> Option<&str>,
    {
        let cursor = self.cursor(feed, writes).await?;
        let items = self
            .monitor
            .observe(Dependency::Graph, query(cursor.clone()).await, writes)
            .unwrap_or_default();

        let Some(last) = items.last() else {
            debug!(feed = %feed, cursor = %cursor, "no new items");
            return Ok(items);
        };

        let current = parse_seconds(feed.cursor_key(), &cursor)?;
        match timestamp_of(last).map(|ts| (ts, ts.trim().parse::<i64>())) {
            Some((ts, Ok(seconds))) if seconds > current => {
                debug!(feed = %feed, from = %cursor, to = %ts, count = items.len(), "advancing cursor");
                writes.schedule(feed.cursor_key(), ts.trim());
            }
            Some((ts, Ok(_))) => {
                warn!(feed = %feed, cursor = %cursor, last = %ts, "fetched items do not move the cursor forward");
            }
            Some((ts, Err(_))) => {
                warn!(feed = %feed, last = %ts, "last item has a non-numeric timestamp, cursor untouched");
            }
            None => {
                warn!(feed = %feed, "last item has no timestamp, cursor untouched");
            }
        }

        Ok(items)
    }
}

pub(crate) fn parse_seconds(key: &str, value: &str) -> DomainResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| DomainError::InvalidTimestamp(key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FixedClock;
    use common::domain::{ConnectorError, InMemoryKeyValueStore, MockSubgraphClient, ResolutionType};

    fn created(id: &str, ts: &str) -> Resolution {
        Resolution {
            id: id.to_string(),
            create_timestamp: Some(ts.to_string()),
            create_by: Some("0xabc".to_string()),
            ..Default::default()
        }
    }

    fn tracker(store: Arc<InMemoryKeyValueStore>, subgraph: MockSubgraphClient) -> CursorTracker {
        let monitor = Arc::new(DependencyMonitor::new(Arc::new(FixedClock::at_seconds(2_000))));
        CursorTracker::new(store, Arc::new(subgraph), monitor)
    }

    #[tokio::test]
    async fn test_fetch_returns_items_in_order_and_advances_cursor() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([("lastCreateTimestamp", "100")]));
        let mut subgraph = MockSubgraphClient::new();
        subgraph
            .expect_created_resolutions()
            .withf(|after: &str| after == "100")
            .times(1)
            .returning(|_| Ok(vec![created("1", "150"), created("2", "200")]));

        let tracker = tracker(store.clone(), subgraph);
        let writes = DeferredWrites::new();

        let items = tracker.fetch_created_resolutions(&writes).await.unwrap();

        let ids: Vec<_> = items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        writes.flush(store.as_ref()).await.unwrap();
        assert_eq!(
            store.get("lastCreateTimestamp").await.unwrap().as_deref(),
            Some("200")
        );
        assert_eq!(store.get("graphErrorTimestamp").await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_second_fetch_without_new_data_is_empty() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mut subgraph = MockSubgraphClient::new();
        subgraph
            .expect_new_offers()
            .withf(|after: &str| after == "0")
            .times(1)
            .returning(|_| {
                Ok(vec![Offer {
                    id: "o1".to_string(),
                    from: "0xA".to_string(),
                    amount: "10".to_string(),
                    create_timestamp: "300".to_string(),
                }])
            });
        subgraph
            .expect_new_offers()
            .withf(|after: &str| after == "300")
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let tracker = tracker(store.clone(), subgraph);

        let first = DeferredWrites::new();
        assert_eq!(tracker.fetch_new_offers(&first).await.unwrap().len(), 1);
        first.flush(store.as_ref()).await.unwrap();

        let second = DeferredWrites::new();
        assert!(tracker.fetch_new_offers(&second).await.unwrap().is_empty());
        second.flush(store.as_ref()).await.unwrap();

        assert_eq!(
            store.get("lastFetchedOfferTimestamp").await.unwrap().as_deref(),
            Some("300")
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_is_empty_and_records_graph_error() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([("lastCreateTimestamp", "100")]));
        let mut subgraph = MockSubgraphClient::new();
        subgraph
            .expect_created_resolutions()
            .returning(|_| Err(ConnectorError::Upstream("indexer lagging".to_string())));

        let tracker = tracker(store.clone(), subgraph);
        let writes = DeferredWrites::new();

        assert!(tracker.fetch_created_resolutions(&writes).await.unwrap().is_empty());
        writes.flush(store.as_ref()).await.unwrap();

        assert_eq!(
            store.get("lastCreateTimestamp").await.unwrap().as_deref(),
            Some("100")
        );
        assert_eq!(
            store.get("graphErrorTimestamp").await.unwrap().as_deref(),
            Some("2000000")
        );
    }

    #[tokio::test]
    async fn test_cursor_never_regresses() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([("lastCreateTimestamp", "500")]));
        let mut subgraph = MockSubgraphClient::new();
        subgraph
            .expect_created_resolutions()
            .returning(|_| Ok(vec![created("9", "400")]));

        let tracker = tracker(store.clone(), subgraph);
        let writes = DeferredWrites::new();

        assert_eq!(tracker.fetch_created_resolutions(&writes).await.unwrap().len(), 1);
        assert_eq!(writes.pending_value("lastCreateTimestamp"), None);
    }

    #[tokio::test]
    async fn test_approved_fetch_computes_voting_starts() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let mut subgraph = MockSubgraphClient::new();
        subgraph.expect_approved_resolutions().returning(|_| {
            Ok(vec![Resolution {
                id: "7".to_string(),
                approve_timestamp: Some("960".to_string()),
                resolution_type: Some(ResolutionType {
                    notice_period: "50".to_string(),
                    voting_period: "100".to_string(),
                }),
                ..Default::default()
            }])
        });

        let tracker = tracker(store, subgraph);
        let writes = DeferredWrites::new();

        let items = tracker.fetch_approved_resolutions(&writes).await.unwrap();

        assert_eq!(items[0].voting_starts.as_deref(), Some("1010"));
        assert_eq!(
            writes.pending_value("lastApprovedTimestamp").as_deref(),
            Some("960")
        );
    }

    #[tokio::test]
    async fn test_invalid_stored_cursor_is_an_error() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([("lastCreateTimestamp", "yesterday")]));
        let subgraph = MockSubgraphClient::new();

        let tracker = tracker(store, subgraph);

        let result = tracker.fetch_created_resolutions(&DeferredWrites::new()).await;

        assert!(matches!(result, Err(DomainError::InvalidTimestamp(key, _)) if key == "lastCreateTimestamp"));
    }
}
