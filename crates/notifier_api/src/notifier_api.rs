use crate::http::{run_http_server, ApiState, HttpServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct NotifierApi {
    state: ApiState,
    config: HttpServerConfig,
}

impl NotifierApi {
    pub fn new(state: ApiState, config: HttpServerConfig) -> Self {
        debug!("Initializing notifier HTTP API");
        Self { state, config }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| Box::pin(async move { run_http_server(self.config, self.state, ctx).await })
    }
}
