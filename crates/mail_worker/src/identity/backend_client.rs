use crate::http::{http_client, transport_error};
use async_trait::async_trait;
use common::domain::{
    ConnectorError, ConnectorResult, Dependency, IdentityProvider, IdentityRecord,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct BackendUserDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackendShareholder {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    user: Option<BackendUserDetails>,
}

/// REST identity provider listing shareholders with their user account.
#[derive(Clone)]
pub struct BackendIdentityProvider {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl BackendIdentityProvider {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            url: url.into(),
            api_key: api_key.into(),
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl IdentityProvider for BackendIdentityProvider {
    /// A JSON list is a success whatever the status; an object carrying
    /// `message` is the backend's error shape.
    #[instrument(skip(self))]
    async fn fetch_identities(&self) -> ConnectorResult<Vec<IdentityRecord>> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(format!("status {status}: {e}")))?;

        if let Some(message) = body.get("message") {
            let message = message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string());
            return Err(ConnectorError::Upstream(message));
        }

        let shareholders: Vec<BackendShareholder> = serde_json::from_value(body)
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        let total = shareholders.len();
        let records: Vec<IdentityRecord> = shareholders
            .into_iter()
            .filter_map(|shareholder| {
                let address = shareholder.address.filter(|a| !a.is_empty())?;
                debug!(address = %address, status = ?shareholder.status, "backend shareholder");
                Some(IdentityRecord {
                    address,
                    email: shareholder.user.and_then(|u| u.email).unwrap_or_default(),
                })
            })
            .collect();

        debug!(shareholders = total, identities = records.len(), "fetched backend users");
        Ok(records)
    }

    fn dependency(&self) -> Dependency {
        Dependency::Backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_backend(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/shareholders",
            get(move |headers: HeaderMap| {
                let body = body.clone();
                async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer backend-key");
                    if authorized {
                        (status, Json(body))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" })))
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}/shareholders")
    }

    fn provider(url: String, key: &str) -> BackendIdentityProvider {
        BackendIdentityProvider::new(url, key, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_identities_reads_user_email() {
        let url = spawn_backend(
            StatusCode::OK,
            json!([
                { "address": "0xAbC", "status": "Board Member",
                  "user": { "id": 1, "name": "Alice", "email": "alice@example.com", "ethAddress": "0xAbC" } },
                { "address": "", "status": "Passive Shareholder",
                  "user": { "id": 2, "name": "Nobody", "email": "nobody@example.com" } }
            ]),
        )
        .await;

        let records = provider(url, "backend-key").fetch_identities().await.unwrap();

        assert_eq!(
            records,
            vec![IdentityRecord {
                address: "0xAbC".to_string(),
                email: "alice@example.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_message_object_is_a_failure() {
        let url = spawn_backend(StatusCode::OK, json!([])).await;

        let result = provider(url, "wrong-key").fetch_identities().await;

        assert_eq!(
            result,
            Err(ConnectorError::Upstream("Unauthorized".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_invalid() {
        let url = spawn_backend(StatusCode::OK, json!({ "users": [] })).await;

        let result = provider(url, "backend-key").fetch_identities().await;

        assert!(matches!(result, Err(ConnectorError::InvalidResponse(_))));
    }
}
