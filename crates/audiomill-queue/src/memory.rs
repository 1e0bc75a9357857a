//! In-memory queue backend for tests.

use crate::delivery::{Delivery, JobQueue, QueueError, QueueResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

const DEFAULT_MAX_DELIVERY_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: Uuid,
    topic: String,
    payload: serde_json::Value,
    attempts: i32,
}

#[derive(Default)]
struct Inner {
    ready: HashMap<String, VecDeque<StoredMessage>>,
    in_flight: HashMap<Uuid, StoredMessage>,
    dead: Vec<StoredMessage>,
}

/// Per-topic FIFO queue with the same custody semantics as the durable
/// backend, minus persistence and requeue backoff (requeued messages become
/// consumable immediately, which keeps tests fast and deterministic).
#[derive(Clone)]
pub struct MemoryJobQueue {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    max_delivery_attempts: i32,
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELIVERY_ATTEMPTS)
    }
}

impl MemoryJobQueue {
    pub fn new(max_delivery_attempts: i32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            notify: Arc::new(Notify::new()),
            max_delivery_attempts,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("queue lock poisoned")
    }

    /// Messages waiting on a topic (not in flight, not dead).
    pub fn ready_len(&self, topic: &str) -> usize {
        self.lock().ready.get(topic).map_or(0, VecDeque::len)
    }

    /// Deliveries currently in a consumer's custody.
    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Dead-lettered message payloads, in dead-letter order.
    pub fn dead_letters(&self) -> Vec<serde_json::Value> {
        self.lock().dead.iter().map(|m| m.payload.clone()).collect()
    }

    pub fn dead_letter_len(&self) -> usize {
        self.lock().dead.len()
    }

    /// Simulate a consumer crash: return every in-flight delivery to its
    /// topic without resolving it, as the durable backend's reaper would.
    pub fn requeue_in_flight(&self) {
        let mut inner = self.lock();
        let stranded: Vec<StoredMessage> = inner.in_flight.drain().map(|(_, m)| m).collect();
        for msg in stranded {
            inner.ready.entry(msg.topic.clone()).or_default().push_back(msg);
        }
        drop(inner);
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> QueueResult<Uuid> {
        let id = Uuid::new_v4();
        let msg = StoredMessage {
            id,
            topic: topic.to_string(),
            payload,
            attempts: 0,
        };
        self.lock().ready.entry(topic.to_string()).or_default().push_back(msg);
        self.notify.notify_waiters();

        tracing::debug!(message_id = %id, topic = %topic, "Message published");
        Ok(id)
    }

    async fn consume(&self, topic: &str) -> QueueResult<Delivery> {
        loop {
            let notified = self.notify.notified();
            if let Some(delivery) = self.try_consume(topic).await? {
                return Ok(delivery);
            }
            notified.await;
        }
    }

    async fn try_consume(&self, topic: &str) -> QueueResult<Option<Delivery>> {
        let mut inner = self.lock();
        let Some(queue) = inner.ready.get_mut(topic) else {
            return Ok(None);
        };
        let Some(mut msg) = queue.pop_front() else {
            return Ok(None);
        };

        msg.attempts += 1;
        let delivery = Delivery {
            message_id: msg.id,
            topic: msg.topic.clone(),
            payload: msg.payload.clone(),
            attempt: msg.attempts,
        };
        inner.in_flight.insert(msg.id, msg);

        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let removed = self.lock().in_flight.remove(&delivery.message_id);
        if removed.is_none() {
            return Err(QueueError::UnknownDelivery(delivery.message_id));
        }
        tracing::debug!(message_id = %delivery.message_id, topic = %delivery.topic, "Message acknowledged");
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> QueueResult<()> {
        let mut inner = self.lock();
        let Some(msg) = inner.in_flight.remove(&delivery.message_id) else {
            return Err(QueueError::UnknownDelivery(delivery.message_id));
        };

        if requeue && msg.attempts < self.max_delivery_attempts {
            tracing::debug!(
                message_id = %msg.id,
                topic = %msg.topic,
                attempt = msg.attempts,
                "Message rejected, requeued"
            );
            inner.ready.entry(msg.topic.clone()).or_default().push_back(msg);
            drop(inner);
            self.notify.notify_waiters();
        } else {
            tracing::warn!(
                message_id = %msg.id,
                topic = %msg.topic,
                attempt = msg.attempts,
                requeue = requeue,
                "Message dead-lettered"
            );
            inner.dead.push(msg);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_consume_ack_removes_message() {
        let queue = MemoryJobQueue::default();
        queue.publish("video", json!({"n": 1})).await.unwrap();

        let delivery = queue.try_consume("video").await.unwrap().unwrap();
        assert_eq!(delivery.attempt, 1);
        assert_eq!(queue.in_flight_len(), 1);

        queue.ack(&delivery).await.unwrap();
        assert_eq!(queue.in_flight_len(), 0);
        assert_eq!(queue.ready_len("video"), 0);
        assert_eq!(queue.dead_letter_len(), 0);
    }

    #[tokio::test]
    async fn topics_are_independent() {
        let queue = MemoryJobQueue::default();
        queue.publish("video", json!({"v": true})).await.unwrap();

        assert!(queue.try_consume("mp3").await.unwrap().is_none());
        assert!(queue.try_consume("video").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fifo_order_within_a_topic() {
        let queue = MemoryJobQueue::default();
        for n in 0..3 {
            queue.publish("video", json!({ "n": n })).await.unwrap();
        }
        for n in 0..3 {
            let delivery = queue.try_consume("video").await.unwrap().unwrap();
            assert_eq!(delivery.payload["n"], n);
            queue.ack(&delivery).await.unwrap();
        }
    }

    #[tokio::test]
    async fn reject_with_requeue_redelivers_with_higher_attempt() {
        let queue = MemoryJobQueue::default();
        queue.publish("video", json!({})).await.unwrap();

        let first = queue.try_consume("video").await.unwrap().unwrap();
        queue.reject(&first, true).await.unwrap();

        let second = queue.try_consume("video").await.unwrap().unwrap();
        assert_eq!(second.message_id, first.message_id);
        assert_eq!(second.attempt, 2);
    }

    #[tokio::test]
    async fn reject_without_requeue_dead_letters_immediately() {
        let queue = MemoryJobQueue::default();
        queue.publish("video", json!({"bad": true})).await.unwrap();

        let delivery = queue.try_consume("video").await.unwrap().unwrap();
        queue.reject(&delivery, false).await.unwrap();

        assert_eq!(queue.dead_letter_len(), 1);
        assert_eq!(queue.ready_len("video"), 0);
        assert!(queue.try_consume("video").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn requeue_past_attempt_cap_dead_letters() {
        let queue = MemoryJobQueue::new(3);
        queue.publish("video", json!({})).await.unwrap();

        for expected_attempt in 1..=3 {
            let delivery = queue.try_consume("video").await.unwrap().unwrap();
            assert_eq!(delivery.attempt, expected_attempt);
            queue.reject(&delivery, true).await.unwrap();
        }

        // Third delivery hit the cap; the message is dead, not redelivered.
        assert!(queue.try_consume("video").await.unwrap().is_none());
        assert_eq!(queue.dead_letter_len(), 1);
    }

    #[tokio::test]
    async fn ack_of_unknown_delivery_is_an_error() {
        let queue = MemoryJobQueue::default();
        let bogus = Delivery {
            message_id: Uuid::new_v4(),
            topic: "video".to_string(),
            payload: json!({}),
            attempt: 1,
        };
        assert!(matches!(
            queue.ack(&bogus).await,
            Err(QueueError::UnknownDelivery(_))
        ));
    }

    #[tokio::test]
    async fn crash_simulation_returns_in_flight_to_ready() {
        let queue = MemoryJobQueue::default();
        queue.publish("video", json!({"job": 1})).await.unwrap();

        let delivery = queue.try_consume("video").await.unwrap().unwrap();
        // Consumer "crashes" before acking.
        queue.requeue_in_flight();

        assert_eq!(queue.in_flight_len(), 0);
        let redelivered = queue.try_consume("video").await.unwrap().unwrap();
        assert_eq!(redelivered.message_id, delivery.message_id);
        assert_eq!(redelivered.attempt, 2);
        // The old delivery handle can no longer be acked.
        assert!(queue.ack(&delivery).await.is_err());
    }

    #[tokio::test]
    async fn consume_wakes_on_publish() {
        let queue = MemoryJobQueue::default();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.consume("video").await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        queue.publish("video", json!({"late": true})).await.unwrap();

        let delivery = consumer.await.unwrap().unwrap();
        assert_eq!(delivery.payload["late"], true);
    }
}
