use anyhow::Context;
use common::domain::ConnectorError;
use std::time::Duration;

/// Client shared by every request of one connector.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

pub(crate) fn transport_error(e: reqwest::Error) -> ConnectorError {
    ConnectorError::Transport(e.to_string())
}

/// Reads the body of a rejected response into an `UnexpectedStatus` error.
pub(crate) async fn unexpected_status(response: reqwest::Response) -> ConnectorError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    ConnectorError::UnexpectedStatus { status, body }
}
