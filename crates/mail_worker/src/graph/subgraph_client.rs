use crate::http::{http_client, transport_error, unexpected_status};
use async_trait::async_trait;
use common::domain::{ConnectorError, ConnectorResult, Offer, Resolution, SubgraphClient};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct ResolutionsData {
    resolutions: Vec<Resolution>,
}

#[derive(Debug, Deserialize)]
struct OffersData {
    offers: Vec<Offer>,
}

/// GraphQL client for the DAO subgraph.
#[derive(Clone)]
pub struct GraphSubgraphClient {
    url: String,
    client: reqwest::Client,
}

impl GraphSubgraphClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            url: url.into(),
            client: http_client(timeout)?,
        })
    }

    /// Posts `query` and decodes its `data` member. A 200 whose body carries
    /// `errors` instead of `data` is a failure.
    async fn query<T: DeserializeOwned>(&self, query: String) -> ConnectorResult<T> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(response).await);
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        match body.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => serde_json::from_value(data)
                .map_err(|e| ConnectorError::InvalidResponse(e.to_string())),
            _ => Err(ConnectorError::Upstream(body.to_string())),
        }
    }
}

#[async_trait]
impl SubgraphClient for GraphSubgraphClient {
    #[instrument(skip(self))]
    async fn created_resolutions(&self, created_after: &str) -> ConnectorResult<Vec<Resolution>> {
        let query = format!(
            "query GetResolutions {{
  resolutions(orderBy: createTimestamp, orderDirection: asc, where: {{createTimestamp_gt: {created_after}}}) {{
    id
    createTimestamp
    createBy
  }}
}}"
        );
        let data: ResolutionsData = self.query(query).await?;
        debug!(count = data.resolutions.len(), "fetched created resolutions");
        Ok(data.resolutions)
    }

    #[instrument(skip(self))]
    async fn approved_resolutions(
        &self,
        approved_after: &str,
    ) -> ConnectorResult<Vec<Resolution>> {
        let query = format!(
            "query GetApprovedResolutions {{
  resolutions(orderBy: approveTimestamp, orderDirection: asc, where: {{approveTimestamp_gt: {approved_after}}}) {{
    id
    createBy
    approveTimestamp
    resolutionType {{
      noticePeriod
      votingPeriod
    }}
  }}
}}"
        );
        let data: ResolutionsData = self.query(query).await?;
        debug!(count = data.resolutions.len(), "fetched approved resolutions");
        Ok(data.resolutions)
    }

    #[instrument(skip(self))]
    async fn new_offers(&self, created_after: &str) -> ConnectorResult<Vec<Offer>> {
        let query = format!(
            "query GetNewOffers {{
  offers(orderBy: createTimestamp, orderDirection: asc, where: {{createTimestamp_gt: {created_after}}}) {{
    id
    from
    amount
    createTimestamp
  }}
}}"
        );
        let data: OffersData = self.query(query).await?;
        debug!(count = data.offers.len(), "fetched new offers");
        Ok(data.offers)
    }
}
