use crate::http::{http_client, transport_error, unexpected_status};
use async_trait::async_trait;
use common::domain::{AccessTokenProvider, ConnectorError, ConnectorResult};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Presents a fixed API key; never fails and makes no request.
#[derive(Clone)]
pub struct StaticApiKey {
    key: String,
}

impl StaticApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticApiKey {
    async fn access_token(&self) -> ConnectorResult<String> {
        Ok(self.key.clone())
    }
}

/// OAuth2 client registration used for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Exchanges a long-lived refresh token for an access token on every call.
#[derive(Clone)]
pub struct OAuthRefreshTokenProvider {
    url: String,
    credentials: OAuthClientCredentials,
    client: reqwest::Client,
}

impl OAuthRefreshTokenProvider {
    pub fn new(
        url: impl Into<String>,
        credentials: OAuthClientCredentials,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            url: url.into(),
            credentials,
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for OAuthRefreshTokenProvider {
    #[instrument(skip(self))]
    async fn access_token(&self) -> ConnectorResult<String> {
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::OK {
            return Err(unexpected_status(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))?;

        match token.access_token {
            Some(token) if !token.is_empty() => {
                debug!("refreshed access token");
                Ok(token)
            }
            _ => Err(ConnectorError::InvalidResponse(
                "token response has no access_token".to_string(),
            )),
        }
    }
}
