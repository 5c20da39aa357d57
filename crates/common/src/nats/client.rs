use crate::nats::NatsKeyValueStore;
use anyhow::{Context, Result};
use async_nats::jetstream::{self, kv};
use tracing::{debug, info, warn};

pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "Connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("Successfully connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Opens the key-value bucket, creating it on first use.
    pub async fn key_value_store(&self, bucket: &str) -> Result<NatsKeyValueStore> {
        let store = match self.jetstream.get_key_value(bucket).await {
            Ok(store) => {
                debug!(bucket = %bucket, "key-value bucket already exists");
                store
            }
            Err(_) => {
                info!(bucket = %bucket, "creating key-value bucket");
                self.jetstream
                    .create_key_value(kv::Config {
                        bucket: bucket.to_string(),
                        description: "Notifier cursors, failure ledgers and health state"
                            .to_string(),
                        history: 1,
                        ..Default::default()
                    })
                    .await
                    .context("Failed to create key-value bucket")?
            }
        };

        Ok(NatsKeyValueStore::new(bucket, store))
    }

    /// Flushes buffered publishes; the connection closes once every handle is dropped.
    pub async fn close(self) {
        info!("Closing NATS connection");
        if let Err(e) = self.client.flush().await {
            warn!(error = %e, "failed to flush NATS connection");
        }
    }
}
