mod config;

use anyhow::Context;
use common::domain::{
    AccessTokenProvider, IdentityProvider, InMemoryKeyValueStore, KeyValueStore,
};
use common::nats::NatsClient;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use crate::config::{IdentitySource, MailAuthMode, ServiceConfig, StoreBackend};
use mail_worker::{
    BackendIdentityProvider, EmailTemplates, GraphSubgraphClient, HealthReporter, MailWorker,
    MailWorkerConfig, NotificationConnectors, NotificationService, OAuthClientCredentials,
    OAuthRefreshTokenProvider, OdooCredentials, OdooIdentityProvider, SendGridMailer, Sender,
    StaticApiKey, SystemClock, TemplateIds,
};
use notifier_api::{ApiState, HttpServerConfig, NotifierApi};
use notifier_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        store_backend = ?config.store_backend,
        identity_provider = ?config.identity_provider,
        "Starting dao-notifier service"
    );
    debug!(
        http_port = config.http_port,
        sweep_interval_secs = config.sweep_interval_secs,
        "Configuration loaded"
    );

    let (store, nats_client) = match initialize_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Failed to initialize state store");
            std::process::exit(1);
        }
    };

    let connectors = match build_connectors(&config) {
        Ok(connectors) => connectors,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Failed to initialize upstream connectors");
            std::process::exit(1);
        }
    };

    if config.template_new_offer.is_empty() {
        warn!("NOTIFIER_TEMPLATE_NEW_OFFER is not set, offer emails will be rejected");
    }
    let templates = EmailTemplates::new(
        TemplateIds {
            pre_draft: config.template_pre_draft.clone(),
            resolution_approved: config.template_resolution_approved.clone(),
            voting_starts: config.template_voting_starts.clone(),
            new_offer: config.template_new_offer.clone(),
        },
        config.dao_url.clone(),
    );

    let identity_dependency = connectors.identities.dependency();
    let notifications = Arc::new(NotificationService::new(
        store.clone(),
        connectors,
        templates,
        Arc::new(SystemClock),
    ));
    let health = Arc::new(HealthReporter::new(store, identity_dependency));

    let mail_worker = MailWorker::new(
        notifications.clone(),
        MailWorkerConfig {
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            sweep_on_start: config.sweep_on_start,
        },
    );
    let notifier_api = NotifierApi::new(
        ApiState {
            notifications,
            health,
        },
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
    );

    Runner::new()
        .with_named_process("notifier_api", notifier_api.into_runner_process())
        .with_named_process("mail_worker", mail_worker.into_runner_process())
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            if let Some(client) = nats_client {
                client.close().await;
            }

            // Flush pending spans
            shutdown_telemetry(telemetry_providers);

            info!("Cleanup complete");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10))
        .run()
        .await;
}

async fn initialize_store(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn KeyValueStore>, Option<NatsClient>)> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory state store, cursors and ledgers are lost on restart");
            let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
            Ok((store, None))
        }
        StoreBackend::Nats => {
            info!("Initializing NATS key-value store...");
            let timeout = Duration::from_secs(config.startup_timeout_secs);
            let client = NatsClient::connect(&config.nats_url, timeout).await?;
            let store = tokio::time::timeout(timeout, client.key_value_store(&config.nats_kv_bucket))
                .await
                .context("Timed out opening the key-value bucket")??;
            let store: Arc<dyn KeyValueStore> = Arc::new(store);
            Ok((store, Some(client)))
        }
    }
}

fn build_connectors(config: &ServiceConfig) -> anyhow::Result<NotificationConnectors> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    require("NOTIFIER_SUBGRAPH_URL", &config.subgraph_url)?;
    require("NOTIFIER_EMAIL_FROM", &config.email_from)?;
    require("NOTIFIER_DAO_URL", &config.dao_url)?;

    let identities: Arc<dyn IdentityProvider> = match config.identity_provider {
        IdentitySource::Odoo => {
            require("NOTIFIER_ODOO_URL", &config.odoo_url)?;
            Arc::new(OdooIdentityProvider::new(
                config.odoo_url.clone(),
                OdooCredentials {
                    database: config.odoo_database.clone(),
                    username: config.odoo_username.clone(),
                    password: config.odoo_password.clone(),
                },
                timeout,
            )?)
        }
        IdentitySource::Backend => {
            require("NOTIFIER_BACKEND_URL", &config.backend_url)?;
            Arc::new(BackendIdentityProvider::new(
                config.backend_url.clone(),
                config.backend_api_key.clone(),
                timeout,
            )?)
        }
    };

    let credentials: Arc<dyn AccessTokenProvider> = match config.mail_auth {
        MailAuthMode::ApiKey => {
            require("NOTIFIER_SENDGRID_API_KEY", &config.sendgrid_api_key)?;
            Arc::new(StaticApiKey::new(config.sendgrid_api_key.clone()))
        }
        MailAuthMode::Oauth => {
            require("NOTIFIER_OAUTH_URL", &config.oauth_url)?;
            Arc::new(OAuthRefreshTokenProvider::new(
                config.oauth_url.clone(),
                OAuthClientCredentials {
                    client_id: config.oauth_client_id.clone(),
                    client_secret: config.oauth_client_secret.clone(),
                    refresh_token: config.oauth_refresh_token.clone(),
                },
                timeout,
            )?)
        }
    };

    Ok(NotificationConnectors {
        subgraph: Arc::new(GraphSubgraphClient::new(config.subgraph_url.clone(), timeout)?),
        identities,
        mailer: Arc::new(SendGridMailer::new(
            config.sendgrid_url.clone(),
            Sender {
                email: config.email_from.clone(),
                name: config.email_from_name.clone(),
            },
            &config.email_cc,
            timeout,
        )?),
        credentials,
    })
}

fn require(name: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must be set");
    }
    Ok(())
}
