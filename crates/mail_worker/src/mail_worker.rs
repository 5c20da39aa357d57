use crate::domain::NotificationService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct MailWorkerConfig {
    pub sweep_interval: Duration,
    /// Run a sweep immediately instead of waiting one interval.
    pub sweep_on_start: bool,
}

/// Scheduled trigger: runs the full notification sweep on a fixed interval.
pub struct MailWorker {
    service: Arc<NotificationService>,
    config: MailWorkerConfig,
}

impl MailWorker {
    pub fn new(service: Arc<NotificationService>, config: MailWorkerConfig) -> Self {
        debug!(interval = ?config.sweep_interval, "Initializing mail worker");
        Self { service, config }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| Box::pin(async move { self.run(ctx).await })
    }

    /// Sweeps until cancelled. A sweep in progress always completes,
    /// including its flush, before cancellation is honoured.
    async fn run(self, ctx: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if !self.config.sweep_on_start {
            ticker.tick().await;
        }

        info!(interval = ?self.config.sweep_interval, "mail worker started");
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = ticker.tick() => {
                    match self.service.run_sweep().await {
                        Ok(summaries) => debug!(kinds = summaries.len(), "scheduled sweep completed"),
                        Err(e) => error!(error = %e, "scheduled sweep failed"),
                    }
                }
            }
        }

        info!("mail worker stopped");
        Ok(())
    }
}
