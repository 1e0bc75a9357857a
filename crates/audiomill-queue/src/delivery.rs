use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Maximum delay in seconds before a requeued message becomes consumable
/// again. Caps exponential backoff so that high attempt counts do not produce
/// excessively long delays.
pub const MAX_REQUEUE_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given delivery attempt (exponential with cap).
#[inline]
pub fn compute_requeue_backoff_seconds(attempt: i32) -> u64 {
    (2_u64.pow(attempt.max(0) as u32)).min(MAX_REQUEUE_BACKOFF_SECS)
}

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Consume failed: {0}")]
    ConsumeFailed(String),

    #[error("Acknowledge failed: {0}")]
    AckFailed(String),

    #[error("Reject failed: {0}")]
    RejectFailed(String),

    #[error("Unknown delivery: {0}")]
    UnknownDelivery(Uuid),

    #[error("Queue configuration error: {0}")]
    ConfigError(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// A consumed message, in the consumer's custody until acked or rejected.
///
/// `attempt` is the total number of times this message has been delivered,
/// this delivery included.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub attempt: i32,
}

/// Durable, ordered, at-least-once delivery channel between pipeline stages.
///
/// Custody rule: every delivery ends in exactly one of `ack` (removed
/// durably) or `reject` (returned for redelivery when `requeue` and under the
/// attempt cap, dead-lettered otherwise). A consumer that disconnects without
/// resolving a delivery gets it redelivered to another consumer.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publish a message onto a topic with persistent marking; it survives a
    /// restart of the backend. Returns the durable message id.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> QueueResult<Uuid>;

    /// Wait for the next available message on a topic and claim it.
    async fn consume(&self, topic: &str) -> QueueResult<Delivery>;

    /// Single claim attempt; returns `None` when nothing is ready.
    async fn try_consume(&self, topic: &str) -> QueueResult<Option<Delivery>>;

    /// Acknowledge a delivery, removing the message durably.
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Reject a delivery. With `requeue` the message returns for redelivery
    /// (dead-lettering once the attempt cap is reached); without it the
    /// message dead-letters immediately.
    async fn reject(&self, delivery: &Delivery, requeue: bool) -> QueueResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requeue_backoff_exponential_then_capped() {
        assert_eq!(compute_requeue_backoff_seconds(0), 1);
        assert_eq!(compute_requeue_backoff_seconds(1), 2);
        assert_eq!(compute_requeue_backoff_seconds(2), 4);
        assert_eq!(compute_requeue_backoff_seconds(8), 256);
        assert_eq!(compute_requeue_backoff_seconds(9), MAX_REQUEUE_BACKOFF_SECS);
        assert_eq!(compute_requeue_backoff_seconds(10), MAX_REQUEUE_BACKOFF_SECS);
    }

    #[test]
    fn negative_attempt_does_not_panic() {
        assert_eq!(compute_requeue_backoff_seconds(-1), 1);
    }
}
