//! Job queue abstraction
//!
//! The queue is the custody chain between pipeline stages: a published message
//! is durable, delivered at least once, and remains the queue's responsibility
//! until a consumer acknowledges it (durable removal) or rejects it (return
//! for redelivery, or dead-letter). A message is never silently dropped.
//!
//! Redelivery is bounded: the attempt counter increments on every claim, and a
//! reject-with-requeue at or past the configured cap dead-letters instead.

mod delivery;
pub mod memory;
pub mod postgres;

pub use delivery::{
    compute_requeue_backoff_seconds, Delivery, JobQueue, QueueError, QueueResult,
    MAX_REQUEUE_BACKOFF_SECS,
};
pub use memory::MemoryJobQueue;
pub use postgres::{PgJobQueue, PgQueueConfig};
