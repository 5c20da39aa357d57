use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Where cursors, ledgers and error timestamps live.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// NATS JetStream key-value bucket.
    Nats,
    /// Process memory; state is lost on restart.
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Odoo,
    Backend,
}

/// How the mail provider credential is obtained.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MailAuthMode {
    ApiKey,
    Oauth,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    // HTTP API configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // Scheduler configuration
    /// Seconds between two scheduled sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Run a sweep as soon as the service starts
    #[serde(default = "default_sweep_on_start")]
    pub sweep_on_start: bool,

    // State store configuration
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,

    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// NATS JetStream key-value bucket holding the notifier state
    #[serde(default = "default_nats_kv_bucket")]
    pub nats_kv_bucket: String,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Timeout of every outbound HTTP request in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // Subgraph configuration
    #[serde(default)]
    pub subgraph_url: String,

    // Identity configuration
    #[serde(default = "default_identity_provider")]
    pub identity_provider: IdentitySource,

    /// Odoo JSON-RPC endpoint
    #[serde(default)]
    pub odoo_url: String,

    #[serde(default)]
    pub odoo_database: String,

    #[serde(default)]
    pub odoo_username: String,

    #[serde(default)]
    pub odoo_password: String,

    /// Backend shareholders endpoint
    #[serde(default)]
    pub backend_url: String,

    #[serde(default)]
    pub backend_api_key: String,

    // Mail configuration
    #[serde(default = "default_sendgrid_url")]
    pub sendgrid_url: String,

    #[serde(default = "default_mail_auth")]
    pub mail_auth: MailAuthMode,

    /// Static API key, used when `mail_auth` is `api_key`
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Token endpoint, used when `mail_auth` is `oauth`
    #[serde(default)]
    pub oauth_url: String,

    #[serde(default)]
    pub oauth_client_id: String,

    #[serde(default)]
    pub oauth_client_secret: String,

    #[serde(default)]
    pub oauth_refresh_token: String,

    #[serde(default)]
    pub email_from: String,

    #[serde(default = "default_email_from_name")]
    pub email_from_name: String,

    /// Comma-separated addresses copied on every email
    #[serde(default)]
    pub email_cc: String,

    /// Base URL of the DAO web app used in email links
    #[serde(default)]
    pub dao_url: String,

    // Template ids
    #[serde(default = "default_template_pre_draft")]
    pub template_pre_draft: String,

    #[serde(default = "default_template_resolution_approved")]
    pub template_resolution_approved: String,

    #[serde(default = "default_template_voting_starts")]
    pub template_voting_starts: String,

    #[serde(default)]
    pub template_new_offer: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "dao-notifier".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_sweep_on_start() -> bool {
    true
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Nats
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_kv_bucket() -> String {
    "dao_notifier".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_identity_provider() -> IdentitySource {
    IdentitySource::Odoo
}

fn default_sendgrid_url() -> String {
    mail_worker::DEFAULT_SENDGRID_URL.to_string()
}

fn default_mail_auth() -> MailAuthMode {
    MailAuthMode::ApiKey
}

fn default_email_from_name() -> String {
    "Solidato OÜ".to_string()
}

fn default_template_pre_draft() -> String {
    mail_worker::DEFAULT_PRE_DRAFT_TEMPLATE_ID.to_string()
}

fn default_template_resolution_approved() -> String {
    mail_worker::DEFAULT_RESOLUTION_APPROVED_TEMPLATE_ID.to_string()
}

fn default_template_voting_starts() -> String {
    mail_worker::DEFAULT_VOTING_STARTS_TEMPLATE_ID.to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("NOTIFIER"))
            .build()?
            .try_deserialize()
    }
}
