//! Supervisor for the notifier's long-running processes.
//!
//! The runner starts every registered process on its own task and keeps them
//! running until one of them fails or the host asks the service to stop
//! (SIGINT/SIGTERM). Once processes are down, the registered closers run
//! under a shared timeout so pending state can be flushed before exit.
//!
//! # Example
//!
//! ```no_run
//! use notifier_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Runner::new()
//!         .with_named_process("ticker", |ctx| async move {
//!             let mut ticker = tokio::time::interval(Duration::from_secs(60));
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => break,
//!                     _ = ticker.tick() => tracing::info!("tick"),
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("flushing");
//!             Ok(())
//!         })
//!         .run()
//!         .await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};

/// Boxed future every process and closer resolves to.
pub type RunnerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A process receives the shared cancellation token and runs until it is cancelled.
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> RunnerFuture + Send>;

/// A closer runs once after every process has stopped.
pub type Closer = Box<dyn FnOnce() -> RunnerFuture + Send>;

struct NamedProcess {
    name: String,
    process: AppProcess,
}

/// Why the runner stopped its processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every process returned `Ok(())` on its own.
    Completed,
    /// The cancellation token fired (signal or external cancel).
    Cancelled,
    /// A process returned an error or panicked.
    Failed { process: String, message: String },
}

pub struct Runner {
    processes: Vec<NamedProcess>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Creates an empty runner with a 10 second closer timeout.
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Registers a process under a name used in logs and failure reports.
    pub fn with_named_process<N, F, Fut>(mut self, name: N, process: F) -> Self
    where
        N: Into<String>,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.processes.push(NamedProcess {
            name: name.into(),
            process: Box::new(move |token| Box::pin(process(token))),
        });
        self
    }

    /// Registers a closer. Closers run concurrently after all processes stop,
    /// whatever the reason; one failing closer does not prevent the others.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(move || Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Uses an externally owned token, so callers can stop the runner themselves.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs until completion, failure or signal, runs the closers, then exits
    /// the process (code 1 when a process failed, 0 otherwise).
    pub async fn run(self) {
        let token = self.cancellation_token.clone();
        spawn_signal_listeners(token.clone());

        let reason = self.run_until_stopped().await;

        match reason {
            StopReason::Failed { process, message } => {
                error!(process = %process, error = %message, "application exiting with error");
                std::process::exit(1);
            }
            StopReason::Completed | StopReason::Cancelled => {
                info!("application exiting normally");
                std::process::exit(0);
            }
        }
    }

    /// Runs processes and closers without installing signal handlers or
    /// exiting, returning why the processes stopped.
    pub async fn run_until_stopped(self) -> StopReason {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for NamedProcess { name, process } in self.processes {
            let process_token = token.clone();
            let span = tracing::info_span!("process", name = %name);
            join_set.spawn(
                async move {
                    debug!("process starting");
                    let result = process(process_token).await;
                    (name, result)
                }
                .instrument(span),
            );
        }

        let mut reason = StopReason::Completed;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    debug!(process = %name, "process completed");
                }
                Ok((name, Err(err))) => {
                    if !token.is_cancelled() {
                        error!(process = %name, error = %format!("{err:#}"), "process failed");
                        reason = StopReason::Failed {
                            process: name,
                            message: format!("{err:#}"),
                        };
                        token.cancel();
                    }
                }
                Err(join_err) => {
                    error!(error = %join_err, "process panicked");
                    if !token.is_cancelled() {
                        reason = StopReason::Failed {
                            process: "unknown".to_string(),
                            message: join_err.to_string(),
                        };
                        token.cancel();
                    }
                }
            }

            if token.is_cancelled() {
                break;
            }
        }

        if reason == StopReason::Completed && token.is_cancelled() {
            reason = StopReason::Cancelled;
        }

        // Cancelled processes get a chance to finish their current unit of work.
        while join_set.join_next().await.is_some() {}

        if !self.closers.is_empty() {
            info!(timeout = ?self.closer_timeout, "running closers");
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => info!("all closers completed"),
                Err(_) => error!(timeout = ?self.closer_timeout, "closers timed out"),
            }
        }

        reason
    }
}

fn spawn_signal_listeners(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => error!(error = %err, "failed to listen for ctrl-c"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM");
                token.cancel();
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    });
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();
    for closer in closers {
        closer_set.spawn(closer());
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => debug!("closer completed"),
            Ok(Err(err)) => error!(error = %format!("{err:#}"), "closer failed"),
            Err(err) => error!(error = %err, "closer panicked"),
        }
    }
}
