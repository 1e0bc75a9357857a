//! Storage abstraction trait

use async_trait::async_trait;
use audiomill_core::BlobId;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(BlobId),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// True when the blob is confirmably absent, as opposed to the store
    /// being unreachable. Consumers treat absence as permanent and anything
    /// else as transient.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One blob collection.
///
/// Blobs are immutable once written: there is no overwrite operation, and the
/// store assigns the identifier so callers cannot collide. `delete` is
/// idempotent: deleting an absent blob succeeds, which keeps compensation
/// paths safe to retry.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a blob and return its newly assigned identifier.
    async fn put(&self, data: Bytes) -> StorageResult<BlobId>;

    /// Fetch a blob by identifier. Absence is reported as
    /// [`StorageError::NotFound`], distinct from backend failures.
    async fn get(&self, id: BlobId) -> StorageResult<Bytes>;

    /// Delete a blob. Succeeds when the blob is already gone.
    async fn delete(&self, id: BlobId) -> StorageResult<()>;

    /// Check whether a blob exists.
    async fn exists(&self, id: BlobId) -> StorageResult<bool>;
}
