use crate::http::{notifier_router, ApiState};
use anyhow::Context;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Serve the API until the token is cancelled, letting in-flight triggers finish.
pub async fn run_http_server(
    config: HttpServerConfig,
    state: ApiState,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid server address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, notifier_router(state))
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            info!("HTTP server shutting down");
        })
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}
