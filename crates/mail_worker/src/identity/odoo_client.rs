use crate::http::{http_client, transport_error, unexpected_status};
use async_trait::async_trait;
use common::domain::{
    ConnectorError, ConnectorResult, Dependency, IdentityProvider, IdentityRecord,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Credentials of the Odoo account used to list users.
#[derive(Debug, Clone)]
pub struct OdooCredentials {
    pub database: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// Odoo JSON-RPC identity provider: logs in, then reads `res.users`.
#[derive(Clone)]
pub struct OdooIdentityProvider {
    url: String,
    credentials: OdooCredentials,
    client: reqwest::Client,
}

impl OdooIdentityProvider {
    pub fn new(
        url: impl Into<String>,
        credentials: OdooCredentials,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            url: url.into(),
            credentials,
            client: http_client(timeout)?,
        })
    }

    /// Issues one `call` and returns its result. An `error` member or a
    /// `false` result is a failure.
    async fn call(&self, service: &str, method: &str, args: Value) -> ConnectorResult<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": xid::new().to_string(),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(unexpected_status(response).await);
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        if let Some(error) = body.error {
            let detail = error
                .data
                .as_ref()
                .and_then(|data| data.get("message"))
                .and_then(Value::as_str)
                .map(|message| format!("{}: {message}", error.message))
                .unwrap_or(error.message);
            return Err(ConnectorError::Upstream(detail));
        }

        match body.result {
            None | Some(Value::Bool(false)) => Err(ConnectorError::FalseResult),
            Some(result) => Ok(result),
        }
    }

    async fn login(&self) -> ConnectorResult<i64> {
        let OdooCredentials {
            database,
            username,
            password,
        } = &self.credentials;
        let uid = self
            .call("common", "login", json!([database, username, password]))
            .await?;
        uid.as_i64()
            .ok_or_else(|| ConnectorError::InvalidResponse(format!("login returned {uid}")))
    }
}

#[async_trait]
impl IdentityProvider for OdooIdentityProvider {
    #[instrument(skip(self))]
    async fn fetch_identities(&self) -> ConnectorResult<Vec<IdentityRecord>> {
        let uid = self.login().await?;
        debug!(uid, "logged in to Odoo");

        let users = self
            .call(
                "object",
                "execute_kw",
                json!([
                    self.credentials.database,
                    uid,
                    self.credentials.password,
                    "res.users",
                    "search_read",
                    [[]],
                    { "fields": ["ethereum_address", "email"] },
                ]),
            )
            .await?;

        let users = users.as_array().ok_or_else(|| {
            ConnectorError::InvalidResponse("res.users search_read is not a list".to_string())
        })?;

        // Odoo encodes empty fields as `false`.
        let records: Vec<IdentityRecord> = users
            .iter()
            .filter_map(|user| {
                let address = user.get("ethereum_address")?.as_str()?;
                let email = user.get("email").and_then(Value::as_str).unwrap_or_default();
                Some(IdentityRecord {
                    address: address.to_string(),
                    email: email.to_string(),
                })
            })
            .filter(|record| !record.address.is_empty())
            .collect();

        debug!(users = users.len(), identities = records.len(), "fetched Odoo users");
        Ok(records)
    }

    fn dependency(&self) -> Dependency {
        Dependency::Odoo
    }
}
