//! Conversion worker: video topic consumer.
//!
//! Custody flow per message: fetch source → transcode → store product →
//! publish to the mp3 topic → acknowledge. The acknowledge is the single
//! point committing "this job has fully transitioned to the next stage", so
//! it strictly follows the publish: a crash between the two costs a
//! duplicate conversion on redelivery, never a lost job.

use std::sync::Arc;
use std::time::Duration;

use audiomill_core::constants::{TOPIC_MP3, TOPIC_VIDEO};
use audiomill_core::{Job, JobStage};
use audiomill_queue::{Delivery, JobQueue};
use audiomill_storage::BlobStore;
use tokio::sync::mpsc;

use crate::codec::Codec;

/// How a delivery was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Published downstream and acknowledged.
    Completed,
    /// Rejected with requeue; the queue will redeliver (transient failure).
    Requeued,
    /// Rejected without requeue (structurally invalid or permanently
    /// unprocessable).
    DeadLettered,
}

pub struct ConversionWorker {
    queue: Arc<dyn JobQueue>,
    source_store: Arc<dyn BlobStore>,
    product_store: Arc<dyn BlobStore>,
    codec: Arc<dyn Codec>,
    codec_timeout: Duration,
}

impl ConversionWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        source_store: Arc<dyn BlobStore>,
        product_store: Arc<dyn BlobStore>,
        codec: Arc<dyn Codec>,
        codec_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            source_store,
            product_store,
            codec,
            codec_timeout,
        }
    }

    /// Consume the video topic until shutdown. One message in flight at a
    /// time; scale out by running more instances.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(topic = TOPIC_VIDEO, "Conversion worker started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Conversion worker shutting down");
                    break;
                }
                result = self.queue.consume(TOPIC_VIDEO) => {
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

    /// Single claim-and-process attempt. Returns the disposition, or `None`
    /// when the topic had nothing ready.
    pub async fn process_one(&self) -> Option<Disposition> {
        match self.queue.try_consume(TOPIC_VIDEO).await {
            Ok(Some(delivery)) => Some(self.handle_delivery(delivery).await),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "Consume failed");
                None
            }
        }
    }

    /// Resolve one delivery. Worker-level failures never surface to a caller;
    /// every path ends in an ack or a reject, logged with enough context for
    /// manual replay.
    async fn handle_delivery(&self, delivery: Delivery) -> Disposition {
        let message_id = delivery.message_id;

        // A structurally invalid message can never succeed; redelivering it
        // would loop forever.
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

        tracing::info!(
            message_id = %message_id,
            source_blob_id = %job.source_blob_id,
            owner = %job.owner_principal,
            attempt = delivery.attempt,
            stage = %JobStage::Converting,
            "Processing conversion job"
        );

        let source = match self.source_store.get(job.source_blob_id).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                // Confirmed absence is permanent; the blob will not reappear.
                tracing::error!(
                    message_id = %message_id,
                    source_blob_id = %job.source_blob_id,
                    "Source blob missing, dead-lettering"
                );
                return self.reject(&delivery, false).await;
            }
            Err(e) => {
                tracing::warn!(
                    message_id = %message_id,
                    source_blob_id = %job.source_blob_id,
                    error = %e,
                    "Source fetch failed, requeueing"
                );
                return self.reject(&delivery, true).await;
            }
        };

        let product_bytes =
            match tokio::time::timeout(self.codec_timeout, self.codec.transcode(&source)).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    tracing::warn!(
                        message_id = %message_id,
                        source_blob_id = %job.source_blob_id,
                        error = %e,
                        "Transcode failed, requeueing"
                    );
                    return self.reject(&delivery, true).await;
                }
                Err(_) => {
                    tracing::warn!(
                        message_id = %message_id,
                        source_blob_id = %job.source_blob_id,
                        timeout_secs = self.codec_timeout.as_secs(),
                        "Transcode timed out, requeueing"
                    );
                    return self.reject(&delivery, true).await;
                }
            };

        let product_blob_id = match self.product_store.put(product_bytes.into()).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    message_id = %message_id,
                    source_blob_id = %job.source_blob_id,
                    error = %e,
                    "Product write failed, requeueing"
                );
                return self.reject(&delivery, true).await;
            }
        };

        let updated = job.with_product(product_blob_id);
        if let Err(e) = self.queue.publish(TOPIC_MP3, updated.to_payload()).await {
            // Undo the product write so no blob exists without an owning
            // message; the redelivered job will produce a fresh one.
            tracing::warn!(
                message_id = %message_id,
                product_blob_id = %product_blob_id,
                error = %e,
                "Publish to mp3 topic failed, compensating and requeueing"
            );
            if let Err(del_err) = self.product_store.delete(product_blob_id).await {
                tracing::error!(
                    product_blob_id = %product_blob_id,
                    error = %del_err,
                    "Compensating delete failed, product blob orphaned"
                );
            }
            return self.reject(&delivery, true).await;
        }

        // Publish succeeded; committing the transition is all that is left.
        if let Err(e) = self.queue.ack(&delivery).await {
            // The job is already downstream; redelivery of the video message
            // will at worst produce a duplicate product.
            tracing::error!(
                message_id = %message_id,
                error = %e,
                "Ack failed after successful publish"
            );
            return Disposition::Completed;
        }

        tracing::info!(
            message_id = %message_id,
            source_blob_id = %job.source_blob_id,
            product_blob_id = %product_blob_id,
            stage = %JobStage::Converted,
            "Conversion job completed"
        );
        Disposition::Completed
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
