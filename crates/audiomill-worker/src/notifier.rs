//! Notification dispatcher: mp3 topic consumer.

use std::sync::Arc;
use std::time::Duration;

use audiomill_core::constants::TOPIC_MP3;
use audiomill_core::{Job, JobStage};
use audiomill_queue::{Delivery, JobQueue};
use tokio::sync::mpsc;

use crate::converter::Disposition;
use crate::transport::Transport;

const NOTIFICATION_SUBJECT: &str = "Audio conversion complete";

pub struct NotificationDispatcher {
    queue: Arc<dyn JobQueue>,
    transport: Arc<dyn Transport>,
}

impl NotificationDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, transport: Arc<dyn Transport>) -> Self {
        Self { queue, transport }
    }

    /// Consume the mp3 topic until shutdown.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(topic = TOPIC_MP3, "Notification dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Notification dispatcher shutting down");
                    break;
                }
                result = self.queue.consume(TOPIC_MP3) => {
                    match result {
                        Ok(delivery) => {
                            self.handle_delivery(delivery).await;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Consume failed, backing off");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    /// Single claim-and-process attempt, for tests and drain loops.
    pub async fn process_one(&self) -> Option<Disposition> {
        match self.queue.try_consume(TOPIC_MP3).await {
            Ok(Some(delivery)) => Some(self.handle_delivery(delivery).await),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "Consume failed");
                None
            }
        }
    }

    async fn handle_delivery(&self, delivery: Delivery) -> Disposition {
        let message_id = delivery.message_id;

        let job = match Job::from_payload(&delivery.payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(
                    message_id = %message_id,
                    error = %e,
                    "Malformed job payload, dead-lettering"
                );
                return self.reject(&delivery, false).await;
            }
        };

        // A job on this topic without a product id cannot be notified about;
        // structurally invalid for this stage.
        let Some(product_blob_id) = job.product_blob_id else {
            tracing::error!(
                message_id = %message_id,
                source_blob_id = %job.source_blob_id,
                "Job has no product blob id, dead-lettering"
            );
            return self.reject(&delivery, false).await;
        };

        let body = format!(
            "Your audio file {} is ready for download.",
            product_blob_id
        );

        // Ack only after the transport confirms delivery. Retrying is safe:
        // a duplicate notification beats a lost one.
        match self
            .transport
            .deliver(&job.owner_principal, NOTIFICATION_SUBJECT, &body)
            .await
        {
            Ok(()) => {
                if let Err(e) = self.queue.ack(&delivery).await {
                    tracing::error!(
                        message_id = %message_id,
                        error = %e,
                        "Ack failed after successful delivery"
                    );
                    return Disposition::Completed;
                }
                tracing::info!(
                    message_id = %message_id,
                    product_blob_id = %product_blob_id,
                    owner = %job.owner_principal,
                    stage = %JobStage::Notified,
                    "Notification delivered"
                );
                Disposition::Completed
            }
            Err(e) => {
                tracing::warn!(
                    message_id = %message_id,
                    owner = %job.owner_principal,
                    error = %e,
                    "Notification delivery failed, requeueing"
                );
                self.reject(&delivery, true).await
            }
        }
    }

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Disposition {
        if let Err(e) = self.queue.reject(delivery, requeue).await {
            tracing::error!(
                message_id = %delivery.message_id,
                error = %e,
                "Reject failed, message will be redelivered after its visibility timeout"
            );
            return Disposition::Requeued;
        }
        if requeue {
            Disposition::Requeued
        } else {
            Disposition::DeadLettered
        }
    }
}
