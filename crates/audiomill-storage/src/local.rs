//! Local filesystem blob store.

use crate::traits::{BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use audiomill_core::BlobId;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation for one blob collection.
///
/// Blobs live under `{base_path}/{prefix}/{id}`. Identifiers are generated
/// UUIDs, so keys never contain caller-controlled path segments.
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    prefix: String,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blob storage (e.g., "/var/lib/audiomill")
    /// * `prefix` - Subdirectory isolating this collection
    pub async fn new(base_path: impl Into<PathBuf>, prefix: String) -> StorageResult<Self> {
        let base_path = base_path.into();
        let collection_dir = base_path.join(&prefix);

        fs::create_dir_all(&collection_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                collection_dir.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { base_path, prefix })
    }

    fn path_for(&self, id: BlobId) -> PathBuf {
        self.base_path.join(&self.prefix).join(id.to_string())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, data: Bytes) -> StorageResult<BlobId> {
        let id = BlobId::generate();
        let path = self.path_for(id);
        let size = data.len();
        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(id)
    }

    async fn get(&self, id: BlobId) -> StorageResult<Bytes> {
        let path = self.path_for(id);
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(id));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage get successful"
        );

        Ok(Bytes::from(data))
    }

    async fn delete(&self, id: BlobId) -> StorageResult<()> {
        let path = self.path_for(id);
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, id: BlobId) -> StorageResult<bool> {
        Ok(fs::try_exists(&self.path_for(id)).await.unwrap_or(false))
    }
}
