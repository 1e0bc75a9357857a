//! Ingress: store the upload, then enqueue the job.
//!
//! The unit of work is store-then-enqueue. When the enqueue fails the stored
//! blob is deleted again; a blob with no owning job would otherwise leak
//! forever, since nothing downstream knows it exists.

use audiomill_auth::Claim;
use audiomill_core::constants::TOPIC_VIDEO;
use audiomill_core::{AppError, BlobId, Job, JobStage};
use audiomill_queue::JobQueue;
use audiomill_storage::BlobStore;
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    /// Durable queue message id; doubles as the caller-visible job id.
    pub job_id: Uuid,
    pub source_blob_id: BlobId,
}

#[derive(Clone)]
pub struct IngressService {
    source_store: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
}

impl IngressService {
    pub fn new(source_store: Arc<dyn BlobStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            source_store,
            queue,
        }
    }

    /// Write the uploaded bytes and publish a conversion job owned by the
    /// claim's subject. Exactly one blob and, on success, exactly one durable
    /// message are created per call.
    pub async fn submit(
        &self,
        claim: &Claim,
        data: Bytes,
        filename: &str,
    ) -> Result<SubmitReceipt, AppError> {
        let size = data.len();

        let source_blob_id = self
            .source_store
            .put(data)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let job = Job::new(source_blob_id, claim.sub.clone());

        let job_id = match self.queue.publish(TOPIC_VIDEO, job.to_payload()).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    source_blob_id = %source_blob_id,
                    owner = %claim.sub,
                    error = %e,
                    "Publish failed after blob write, compensating"
                );
                if let Err(del_err) = self.source_store.delete(source_blob_id).await {
                    tracing::error!(
                        source_blob_id = %source_blob_id,
                        error = %del_err,
                        "Compensating delete failed, source blob orphaned"
                    );
                }
                return Err(AppError::Queue(e.to_string()));
            }
        };

        tracing::info!(
            job_id = %job_id,
            source_blob_id = %source_blob_id,
            owner = %claim.sub,
            filename = %filename,
            size_bytes = size,
            stage = %JobStage::Submitted,
            "Conversion job submitted"
        );

        Ok(SubmitReceipt {
            job_id,
            source_blob_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use audiomill_queue::{Delivery, MemoryJobQueue, QueueError, QueueResult};
    use audiomill_storage::MemoryBlobStore;

    fn claim_for(sub: &str) -> Claim {
        Claim {
            sub: sub.to_string(),
            iat: 0,
            exp: i64::MAX,
            privileged: true,
        }
    }

    struct BrokenQueue;

    #[async_trait]
    impl JobQueue for BrokenQueue {
        async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> QueueResult<Uuid> {
            Err(QueueError::PublishFailed("broker unavailable".to_string()))
        }

        async fn consume(&self, _topic: &str) -> QueueResult<Delivery> {
            Err(QueueError::ConsumeFailed("broker unavailable".to_string()))
        }

        async fn try_consume(&self, _topic: &str) -> QueueResult<Option<Delivery>> {
            Ok(None)
        }

        async fn ack(&self, _delivery: &Delivery) -> QueueResult<()> {
            Ok(())
        }

        async fn reject(&self, _delivery: &Delivery, _requeue: bool) -> QueueResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn submit_stores_blob_and_publishes_job() {
        let store = MemoryBlobStore::new();
        let queue = MemoryJobQueue::default();
        let ingress = IngressService::new(Arc::new(store.clone()), Arc::new(queue.clone()));

        let receipt = ingress
            .submit(
                &claim_for("alice@example.com"),
                Bytes::from_static(b"fake mp4"),
                "clip.mp4",
            )
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(queue.ready_len(TOPIC_VIDEO), 1);

        let delivery = queue.try_consume(TOPIC_VIDEO).await.unwrap().unwrap();
        assert_eq!(delivery.message_id, receipt.job_id);
        let job = Job::from_payload(&delivery.payload).unwrap();
        assert_eq!(job.source_blob_id, receipt.source_blob_id);
        assert_eq!(job.owner_principal, "alice@example.com");
        assert_eq!(job.product_blob_id, None);
    }

    #[tokio::test]
    async fn publish_failure_deletes_blob_and_reports_queue_error() {
        let store = MemoryBlobStore::new();
        let ingress = IngressService::new(Arc::new(store.clone()), Arc::new(BrokenQueue));

        let err = ingress
            .submit(
                &claim_for("alice@example.com"),
                Bytes::from_static(b"fake mp4"),
                "clip.mp4",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Queue(_)));
        // Compensation: no orphaned blob.
        assert!(store.is_empty());
    }
}
