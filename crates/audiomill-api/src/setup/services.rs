//! Service graph construction and worker spawning.

use anyhow::{Context, Result};
use audiomill_auth::{PgCredentialStore, TokenService};
use audiomill_core::constants::{PRODUCT_PREFIX, SOURCE_PREFIX};
use audiomill_core::Config;
use audiomill_queue::{JobQueue, PgJobQueue, PgQueueConfig};
use audiomill_storage::build_blob_store;
use audiomill_worker::{ConversionWorker, EmailTransport, FfmpegCodec, NotificationDispatcher};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::services::IngressService;
use crate::state::AppState;

/// Shutdown handles for spawned workers.
#[derive(Default)]
pub struct WorkerHandles {
    shutdown_txs: Vec<mpsc::Sender<()>>,
}

impl WorkerHandles {
    fn push(&mut self, tx: mpsc::Sender<()>) {
        self.shutdown_txs.push(tx);
    }

    /// Signal every worker to stop consuming. Does not wait for in-flight
    /// messages; unresolved deliveries are redelivered by the queue.
    pub async fn shutdown(&self) {
        for tx in &self.shutdown_txs {
            let _ = tx.send(()).await;
        }
    }

    pub fn count(&self) -> usize {
        self.shutdown_txs.len()
    }
}

/// Build the application state over the configured backends.
pub async fn build_state(config: Config, pool: PgPool) -> Result<Arc<AppState>> {
    let source_store = build_blob_store(&config, SOURCE_PREFIX)
        .await
        .context("Failed to build source blob store")?;
    let product_store = build_blob_store(&config, PRODUCT_PREFIX)
        .await
        .context("Failed to build product blob store")?;

    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(
        pool.clone(),
        PgQueueConfig {
            max_delivery_attempts: config.queue_max_delivery_attempts(),
            poll_interval_ms: config.queue_poll_interval_ms(),
            visibility_timeout_secs: config.queue_visibility_timeout_secs(),
            reap_interval_secs: config.queue_reap_interval_secs(),
        },
    ));

    let credentials = Arc::new(PgCredentialStore::new(pool));
    let token_service = Arc::new(TokenService::new(
        credentials,
        config.jwt_secret(),
        config.jwt_expiry_hours(),
    ));

    let ingress = IngressService::new(source_store.clone(), queue.clone());

    let is_production = config.is_production();
    Ok(Arc::new(AppState {
        config,
        token_service,
        source_store,
        product_store,
        queue,
        ingress,
        is_production,
    }))
}

/// Spawn the configured conversion workers and notification dispatchers.
pub fn spawn_workers(state: &Arc<AppState>, config: &Config) -> WorkerHandles {
    let mut handles = WorkerHandles::default();

    if config.run_converter() {
        let codec = Arc::new(FfmpegCodec::new(config.ffmpeg_path()));
        let codec_timeout = Duration::from_secs(config.codec_timeout_secs());
        for instance in 0..config.converter_instances() {
            let (tx, rx) = mpsc::channel(1);
            let worker = ConversionWorker::new(
                state.queue.clone(),
                state.source_store.clone(),
                state.product_store.clone(),
                codec.clone(),
                codec_timeout,
            );
            tokio::spawn(async move { worker.run(rx).await });
            handles.push(tx);
            tracing::info!(instance = instance, "Conversion worker spawned");
        }
    }

    if config.run_dispatcher() {
        match EmailTransport::from_config(config) {
            Some(transport) => {
                let transport = Arc::new(transport);
                for instance in 0..config.dispatcher_instances() {
                    let (tx, rx) = mpsc::channel(1);
                    let dispatcher =
                        NotificationDispatcher::new(state.queue.clone(), transport.clone());
                    tokio::spawn(async move { dispatcher.run(rx).await });
                    handles.push(tx);
                    tracing::info!(instance = instance, "Notification dispatcher spawned");
                }
            }
            None => {
                tracing::warn!(
                    "RUN_DISPATCHER is set but SMTP is not configured; notification dispatcher disabled"
                );
            }
        }
    }

    handles
}
