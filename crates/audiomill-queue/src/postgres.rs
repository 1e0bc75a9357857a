//! Durable Postgres queue backend.
//!
//! Messages live in the `queue_messages` table. Claiming uses
//! `FOR UPDATE SKIP LOCKED` so competing consumers never receive the same
//! message twice concurrently; `pg_notify` wakes idle consumers the moment a
//! message is published, with polling as the fallback. A reaper task returns
//! deliveries stranded by a crashed consumer to the ready state once their
//! visibility timeout lapses, which is the pipeline's crash-redelivery path.

use crate::delivery::{
    compute_requeue_backoff_seconds, Delivery, JobQueue, QueueError, QueueResult,
};
use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// Channel name for PostgreSQL LISTEN/NOTIFY when a message is published.
pub const MESSAGE_NOTIFY_CHANNEL: &str = "audiomill_new_message";

#[derive(Clone, Debug)]
pub struct PgQueueConfig {
    pub max_delivery_attempts: i32,
    pub poll_interval_ms: u64,
    /// Seconds an in-flight delivery may remain unresolved before the reaper
    /// treats its consumer as gone and returns the message for redelivery.
    pub visibility_timeout_secs: i64,
    /// Interval in seconds between reaper runs. 0 = disabled.
    pub reap_interval_secs: u64,
}

impl Default for PgQueueConfig {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 5,
            poll_interval_ms: 1000,
            visibility_timeout_secs: 600,
            reap_interval_secs: 60,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    topic: String,
    payload: serde_json::Value,
    attempts: i32,
}

/// Postgres-backed [`JobQueue`].
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    config: PgQueueConfig,
    wake: Arc<Notify>,
}

impl PgJobQueue {
    /// Create the queue client and spawn its listener and reaper tasks.
    ///
    /// The listener forwards NOTIFY wakeups to blocked consumers and
    /// reconnects on failure; consumers fall back to polling either way.
    pub fn new(pool: PgPool, config: PgQueueConfig) -> Self {
        let wake = Arc::new(Notify::new());

        Self::spawn_listener(pool.clone(), wake.clone());
        if config.reap_interval_secs > 0 {
            Self::spawn_reaper(pool.clone(), config.clone(), wake.clone());
        }

        Self { pool, config, wake }
    }

    fn spawn_listener(pool: PgPool, wake: Arc<Notify>) {
        tokio::spawn(async move {
            loop {
                match PgListener::connect_with(&pool).await {
                    Ok(mut listener) => {
                        if let Err(e) = listener.listen(MESSAGE_NOTIFY_CHANNEL).await {
                            tracing::warn!(error = %e, "LISTEN failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            continue;
                        }
                        while listener.recv().await.is_ok() {
                            wake.notify_waiters();
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "PgListener connect failed, will retry");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    fn spawn_reaper(pool: PgPool, config: PgQueueConfig, wake: Arc<Notify>) {
        let interval = Duration::from_secs(config.reap_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match reap_stale_deliveries(
                    &pool,
                    config.visibility_timeout_secs,
                    config.max_delivery_attempts,
                )
                .await
                {
                    Ok((requeued, dead)) => {
                        if requeued > 0 || dead > 0 {
                            tracing::warn!(
                                requeued = requeued,
                                dead_lettered = dead,
                                "Stale deliveries reaped"
                            );
                            if requeued > 0 {
                                wake.notify_waiters();
                            }
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Stale delivery reaper failed"),
                }
            }
        });
    }
}

/// Dead-letter exhausted stale deliveries, then return the rest to ready.
/// Returns (requeued, dead_lettered) counts.
async fn reap_stale_deliveries(
    pool: &PgPool,
    visibility_timeout_secs: i64,
    max_delivery_attempts: i32,
) -> Result<(u64, u64), sqlx::Error> {
    let dead = sqlx::query(
        r#"
        UPDATE queue_messages
        SET status = 'dead',
            updated_at = NOW()
        WHERE status = 'in_flight'
            AND claimed_at < NOW() - make_interval(secs => $1::double precision)
            AND attempts >= $2
        "#,
    )
    .bind(visibility_timeout_secs)
    .bind(max_delivery_attempts)
    .execute(pool)
    .await?
    .rows_affected();

    let requeued = sqlx::query(
        r#"
        UPDATE queue_messages
        SET status = 'ready',
            claimed_at = NULL,
            available_at = NOW(),
            updated_at = NOW()
        WHERE status = 'in_flight'
            AND claimed_at < NOW() - make_interval(secs => $1::double precision)
        "#,
    )
    .bind(visibility_timeout_secs)
    .execute(pool)
    .await?
    .rows_affected();

    Ok((requeued, dead))
}

#[async_trait]
impl JobQueue for PgJobQueue {
    #[tracing::instrument(skip(self, payload))]
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> QueueResult<Uuid> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        let row: MessageRow = sqlx::query_as::<Postgres, MessageRow>(
            r#"
            INSERT INTO queue_messages (topic, payload, status, attempts, available_at)
            VALUES ($1, $2, 'ready', 0, NOW())
            RETURNING id, topic, payload, attempts
            "#,
        )
        .bind(topic)
        .bind(&payload)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, topic = %topic, "Failed to insert queue message");
            QueueError::PublishFailed(e.to_string())
        })?;

        // Wake idle consumers immediately instead of waiting for the poll
        // interval. Non-fatal: consumers poll either way.
        if let Err(e) = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(MESSAGE_NOTIFY_CHANNEL)
            .bind(topic)
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(
                error = %e,
                message_id = %row.id,
                "Failed to send pg_notify, consumers will discover the message via polling"
            );
        }

        tx.commit()
            .await
            .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        tracing::info!(message_id = %row.id, topic = %topic, "Message published");
        Ok(row.id)
    }

    async fn consume(&self, topic: &str) -> QueueResult<Delivery> {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            let wake = self.wake.notified();
            if let Some(delivery) = self.try_consume(topic).await? {
                return Ok(delivery);
            }
            tokio::select! {
                _ = wake => {}
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn try_consume(&self, topic: &str) -> QueueResult<Option<Delivery>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| QueueError::ConsumeFailed(e.to_string()))?;

        let row: Option<MessageRow> = sqlx::query_as::<Postgres, MessageRow>(
            r#"
            SELECT id, topic, payload, attempts
            FROM queue_messages
            WHERE topic = $1
                AND status = 'ready'
                AND available_at <= NOW()
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(topic)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| QueueError::ConsumeFailed(e.to_string()))?;

        let Some(row) = row else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        let claimed: MessageRow = sqlx::query_as::<Postgres, MessageRow>(
            r#"
            UPDATE queue_messages
            SET status = 'in_flight',
                attempts = attempts + 1,
                claimed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, topic, payload, attempts
            "#,
        )
        .bind(row.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| QueueError::ConsumeFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| QueueError::ConsumeFailed(e.to_string()))?;

        tracing::debug!(
            message_id = %claimed.id,
            topic = %claimed.topic,
            attempt = claimed.attempts,
            "Message claimed"
        );

        Ok(Some(Delivery {
            message_id: claimed.id,
            topic: claimed.topic,
            payload: claimed.payload,
            attempt: claimed.attempts,
        }))
    }

    #[tracing::instrument(skip(self, delivery), fields(message_id = %delivery.message_id))]
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        let affected = sqlx::query(
            r#"
            DELETE FROM queue_messages
            WHERE id = $1 AND status = 'in_flight'
            "#,
        )
        .bind(delivery.message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::AckFailed(e.to_string()))?
        .rows_affected();

        if affected == 0 {
            // The delivery was reaped (visibility timeout) and is no longer
            // ours to resolve.
            return Err(QueueError::UnknownDelivery(delivery.message_id));
        }

        tracing::debug!(topic = %delivery.topic, "Message acknowledged");
        Ok(())
    }

    #[tracing::instrument(skip(self, delivery), fields(message_id = %delivery.message_id))]
    async fn reject(&self, delivery: &Delivery, requeue: bool) -> QueueResult<()> {
        let dead_letter = !requeue || delivery.attempt >= self.config.max_delivery_attempts;

        let affected = if dead_letter {
            sqlx::query(
                r#"
                UPDATE queue_messages
                SET status = 'dead',
                    updated_at = NOW()
                WHERE id = $1 AND status = 'in_flight'
                "#,
            )
            .bind(delivery.message_id)
            .execute(&self.pool)
            .await
        } else {
            let backoff = compute_requeue_backoff_seconds(delivery.attempt);
            sqlx::query(
                r#"
                UPDATE queue_messages
                SET status = 'ready',
                    claimed_at = NULL,
                    available_at = NOW() + make_interval(secs => $2::double precision),
                    updated_at = NOW()
                WHERE id = $1 AND status = 'in_flight'
                "#,
            )
            .bind(delivery.message_id)
            .bind(backoff as i64)
            .execute(&self.pool)
            .await
        }
        .map_err(|e| QueueError::RejectFailed(e.to_string()))?
        .rows_affected();

        if affected == 0 {
            return Err(QueueError::UnknownDelivery(delivery.message_id));
        }

        if dead_letter {
            tracing::warn!(
                topic = %delivery.topic,
                attempt = delivery.attempt,
                requeue = requeue,
                "Message dead-lettered"
            );
        } else {
            tracing::debug!(
                topic = %delivery.topic,
                attempt = delivery.attempt,
                "Message rejected, requeued"
            );
        }
        Ok(())
    }
}
