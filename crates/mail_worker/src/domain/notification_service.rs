use crate::domain::{
    parse_seconds, Clock, CursorTracker, DeferredWrites, DependencyMonitor, EmailDirectory,
    EmailTemplates, FailureLedger, NotificationKind,
};
use chrono::Duration;
use common::domain::{
    AccessTokenProvider, ConnectorError, ConnectorResult, Dependency, DomainError, DomainResult,
    EmailMessage, IdentityProvider, KeyValueStore, Mailer, Offer, Resolution, SubgraphClient,
};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Seconds since epoch of the last voting-starts run.
pub const LAST_VOTING_EMAIL_SENT_KEY: &str = "lastVotingEmailSent";

/// How far back approvals are considered when looking for votes that opened.
pub fn voting_lookback() -> Duration {
    Duration::days(30)
}

/// An entity that can be notified and stored in a failure ledger.
pub trait Notifiable: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn id(&self) -> &str;

    /// Address whose email receives the notification.
    fn recipient_address(&self) -> Option<&str>;
}

impl Notifiable for Resolution {
    fn id(&self) -> &str {
        &self.id
    }

    fn recipient_address(&self) -> Option<&str> {
        self.create_by.as_deref()
    }
}

impl Notifiable for Offer {
    fn id(&self) -> &str {
        &self.id
    }

    fn recipient_address(&self) -> Option<&str> {
        Some(&self.from)
    }
}

/// Outcome of one notification kind within an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub kind: NotificationKind,
    /// Items returned by the feed this run.
    pub fetched: usize,
    /// Items carried over from the failure ledger.
    pub retried: usize,
    /// True when the send step was gated off and the ledger left as it was.
    pub skipped: bool,
    /// Ids whose notification failed, in processing order.
    pub failed_ids: Vec<String>,
}

impl RunSummary {
    fn new(kind: NotificationKind, fetched: usize, retried: usize) -> Self {
        Self {
            kind,
            fetched,
            retried,
            skipped: false,
            failed_ids: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        if self.skipped {
            0
        } else {
            self.fetched + self.retried
        }
    }
}

/// Upstream clients used by the notification pipelines.
#[derive(Clone)]
pub struct NotificationConnectors {
    pub subgraph: Arc<dyn SubgraphClient>,
    pub identities: Arc<dyn IdentityProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub credentials: Arc<dyn AccessTokenProvider>,
}

/// Runs the per-kind pipelines: fetch, merge with the failure ledger,
/// resolve recipients, send, then replace the ledger with what failed.
///
/// Every invocation collects its key-value writes in a [`DeferredWrites`]
/// set and flushes it before returning, whatever the outcome. The ledger is
/// read before the feed so a failed read leaves the cursor where it was.
pub struct NotificationService {
    store: Arc<dyn KeyValueStore>,
    cursors: CursorTracker,
    ledger: FailureLedger,
    monitor: Arc<DependencyMonitor>,
    connectors: NotificationConnectors,
    templates: EmailTemplates,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        connectors: NotificationConnectors,
        templates: EmailTemplates,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let monitor = Arc::new(DependencyMonitor::new(clock.clone()));
        Self {
            cursors: CursorTracker::new(
                store.clone(),
                connectors.subgraph.clone(),
                monitor.clone(),
            ),
            ledger: FailureLedger::new(store.clone()),
            store,
            monitor,
            connectors,
            templates,
            clock,
        }
    }

    /// Runs a single kind with a freshly fetched email directory.
    #[instrument(skip(self))]
    pub async fn run_kind(&self, kind: NotificationKind) -> DomainResult<RunSummary> {
        let writes = DeferredWrites::new();
        let directory = self.load_directory(&writes).await;

        let result = self.run_with_directory(kind, &directory, &writes).await;
        let flushed = writes.flush(self.store.as_ref()).await;

        let summary = result?;
        flushed?;
        Ok(summary)
    }

    /// Runs every kind in sweep order with one shared directory. A kind that
    /// fails does not stop the others; the first error is returned after
    /// the writes are flushed.
    #[instrument(skip(self))]
    pub async fn run_sweep(&self) -> DomainResult<Vec<RunSummary>> {
        let writes = DeferredWrites::new();
        let directory = self.load_directory(&writes).await;

        let mut summaries = Vec::with_capacity(NotificationKind::ALL.len());
        let mut first_error: Option<DomainError> = None;
        for kind in NotificationKind::ALL {
            match self.run_with_directory(kind, &directory, &writes).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!(kind = %kind, error = %e, "notification run failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        let flushed = writes.flush(self.store.as_ref()).await;
        if let Some(e) = first_error {
            return Err(e);
        }
        flushed?;

        info!(
            failed = summaries.iter().map(|s| s.failed_ids.len()).sum::<usize>(),
            "sweep completed"
        );
        Ok(summaries)
    }

    async fn run_with_directory(
        &self,
        kind: NotificationKind,
        directory: &EmailDirectory,
        writes: &DeferredWrites,
    ) -> DomainResult<RunSummary> {
        let summary = match kind {
            NotificationKind::PreDraft => self.notify_pre_draft(directory, writes).await?,
            NotificationKind::ResolutionApproved => {
                self.notify_resolution_approved(directory, writes).await?
            }
            NotificationKind::VotingStarts => self.notify_voting_starts(directory, writes).await?,
            NotificationKind::NewOffer => self.notify_new_offers(directory, writes).await?,
        };

        info!(
            kind = %kind,
            fetched = summary.fetched,
            retried = summary.retried,
            skipped = summary.skipped,
            failed = summary.failed_ids.len(),
            "notification run finished"
        );
        Ok(summary)
    }

    async fn load_directory(&self, writes: &DeferredWrites) -> EmailDirectory {
        let identities = &self.connectors.identities;
        let directory = self
            .monitor
            .observe(identities.dependency(), identities.fetch_identities().await, writes)
            .map(EmailDirectory::from_identities)
            .unwrap_or_default();
        debug!(entries = directory.len(), "loaded email directory");
        directory
    }

    /// Created resolutions. Never gated: with an empty directory every item
    /// fails with "no recipients" and lands in the ledger.
    async fn notify_pre_draft(
        &self,
        directory: &EmailDirectory,
        writes: &DeferredWrites,
    ) -> DomainResult<RunSummary> {
        let kind = NotificationKind::PreDraft;
        let previous: Vec<Resolution> = self.ledger.read(kind, writes).await?;
        let fresh = self.cursors.fetch_created_resolutions(writes).await?;

        let mut summary = RunSummary::new(kind, fresh.len(), previous.len());
        let total = merge(previous, fresh);

        summary.failed_ids = self
            .dispatch(kind, &total, directory, writes, |resolution: &Resolution, to| {
                Ok(self.templates.pre_draft(resolution, to))
            })
            .await;
        self.record_failures(kind, &total, &summary.failed_ids, writes)?;
        Ok(summary)
    }

    async fn notify_resolution_approved(
        &self,
        directory: &EmailDirectory,
        writes: &DeferredWrites,
    ) -> DomainResult<RunSummary> {
        let kind = NotificationKind::ResolutionApproved;
        let previous: Vec<Resolution> = self.ledger.read(kind, writes).await?;
        let fresh = self.cursors.fetch_approved_resolutions(writes).await?;

        let mut summary = RunSummary::new(kind, fresh.len(), previous.len());
        let total = merge(previous, fresh);
        if is_gated(kind, &total, directory) {
            summary.skipped = true;
            return Ok(summary);
        }

        summary.failed_ids = self
            .dispatch(kind, &total, directory, writes, |resolution: &Resolution, to| {
                self.templates.resolution_approved(resolution, to)
            })
            .await;
        self.record_failures(kind, &total, &summary.failed_ids, writes)?;
        Ok(summary)
    }

    async fn notify_new_offers(
        &self,
        directory: &EmailDirectory,
        writes: &DeferredWrites,
    ) -> DomainResult<RunSummary> {
        let kind = NotificationKind::NewOffer;
        let previous: Vec<Offer> = self.ledger.read(kind, writes).await?;
        let fresh = self.cursors.fetch_new_offers(writes).await?;

        let mut summary = RunSummary::new(kind, fresh.len(), previous.len());
        let total = merge(previous, fresh);
        if is_gated(kind, &total, directory) {
            summary.skipped = true;
            return Ok(summary);
        }

        summary.failed_ids = self
            .dispatch(kind, &total, directory, writes, |offer: &Offer, to| {
                Ok(self.templates.new_offer(offer, to))
            })
            .await;
        self.record_failures(kind, &total, &summary.failed_ids, writes)?;
        Ok(summary)
    }

    /// Resolutions whose voting opened since the previous run. The window
    /// marker moves to "now" even when sending was gated off or failed;
    /// failed items survive through the ledger only.
    async fn notify_voting_starts(
        &self,
        directory: &EmailDirectory,
        writes: &DeferredWrites,
    ) -> DomainResult<RunSummary> {
        let kind = NotificationKind::VotingStarts;
        let now = self.clock.now();
        let now_seconds = now.timestamp();
        let last_sent = self.last_voting_email_sent(writes).await?;
        let previous: Vec<Resolution> = self.ledger.read(kind, writes).await?;

        let approved_since = (now - voting_lookback()).timestamp().max(0).to_string();
        let due: Vec<Resolution> = self
            .monitor
            .observe(
                Dependency::Graph,
                self.connectors
                    .subgraph
                    .approved_resolutions(&approved_since)
                    .await,
                writes,
            )
            .unwrap_or_default()
            .into_iter()
            .map(Resolution::with_computed_voting_starts)
            .filter(|resolution| {
                resolution
                    .voting_starts_seconds()
                    .is_some_and(|starts| last_sent < starts && starts < now_seconds)
            })
            .collect();
        debug!(last_sent, now = now_seconds, due = due.len(), "computed voting window");

        let mut summary = RunSummary::new(kind, due.len(), previous.len());
        let total = merge(previous, due);

        if is_gated(kind, &total, directory) {
            summary.skipped = true;
        } else {
            summary.failed_ids = self
                .dispatch(kind, &total, directory, writes, |resolution: &Resolution, to| {
                    Ok(self.templates.voting_starts(resolution, to))
                })
                .await;
            self.record_failures(kind, &total, &summary.failed_ids, writes)?;
        }

        writes.schedule(LAST_VOTING_EMAIL_SENT_KEY, now_seconds.to_string());
        Ok(summary)
    }

    async fn last_voting_email_sent(&self, writes: &DeferredWrites) -> DomainResult<i64> {
        match writes
            .read(self.store.as_ref(), LAST_VOTING_EMAIL_SENT_KEY)
            .await?
            .filter(|value| !value.trim().is_empty())
        {
            Some(value) => parse_seconds(LAST_VOTING_EMAIL_SENT_KEY, &value),
            None => Ok(0),
        }
    }

    /// Sends one email per entity concurrently and returns the ids that
    /// failed. Failures are isolated: one entity never affects another.
    async fn dispatch<T, B>(
        &self,
        kind: NotificationKind,
        entities: &[T],
        directory: &EmailDirectory,
        writes: &DeferredWrites,
        build: B,
    ) -> Vec<String>
    where
        T: Notifiable,
        B: Fn(&T, Vec<String>) -> ConnectorResult<EmailMessage> + Sync,
    {
        if entities.is_empty() {
            return Vec::new();
        }

        let credential = self.monitor.observe(
            Dependency::Auth,
            self.connectors.credentials.access_token().await,
            writes,
        );

        let outcomes = join_all(entities.iter().map(|entity| {
            self.send_one(entity, directory, credential.as_deref(), &build)
        }))
        .await;

        entities
            .iter()
            .zip(outcomes)
            .filter_map(|(entity, outcome)| match outcome {
                Ok(()) => {
                    info!(kind = %kind, id = %entity.id(), "email sent");
                    None
                }
                Err(e) => {
                    error!(kind = %kind, id = %entity.id(), error = %e, "email not sent");
                    Some(entity.id().to_string())
                }
            })
            .collect()
    }

    async fn send_one<T, B>(
        &self,
        entity: &T,
        directory: &EmailDirectory,
        credential: Option<&str>,
        build: &B,
    ) -> ConnectorResult<()>
    where
        T: Notifiable,
        B: Fn(&T, Vec<String>) -> ConnectorResult<EmailMessage>,
    {
        let recipients = directory.recipients_for(entity.recipient_address());
        if recipients.is_empty() {
            return Err(ConnectorError::NoRecipients);
        }
        let credential = credential.ok_or(ConnectorError::CredentialUnavailable)?;
        let message = build(entity, recipients)?;
        self.connectors.mailer.send(&message, credential).await
    }

    /// Replaces the ledger with the processed entities whose id failed.
    fn record_failures<T: Notifiable>(
        &self,
        kind: NotificationKind,
        processed: &[T],
        failed_ids: &[String],
        writes: &DeferredWrites,
    ) -> DomainResult<()> {
        let still_failed: Vec<T> = processed
            .iter()
            .filter(|entity| failed_ids.iter().any(|id| id == entity.id()))
            .cloned()
            .collect();
        self.ledger.write(kind, &still_failed, writes)
    }
}

/// Ledger entries first, then fresh items. Duplicated ids are kept.
fn merge<T>(previous: Vec<T>, fresh: Vec<T>) -> Vec<T> {
    let mut total = previous;
    total.extend(fresh);
    total
}

fn is_gated<T>(kind: NotificationKind, total: &[T], directory: &EmailDirectory) -> bool {
    if total.is_empty() {
        debug!(kind = %kind, "nothing to notify");
        return true;
    }
    if directory.is_empty() {
        warn!(kind = %kind, pending = total.len(), "email directory unavailable, skipping send");
        return true;
    }
    false
}
