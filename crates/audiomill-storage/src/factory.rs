//! Backend selection from configuration.

use crate::traits::{BlobStore, StorageError, StorageResult};
use audiomill_core::config::StorageBackend;
use audiomill_core::Config;
use std::sync::Arc;

/// Build one blob collection for the configured backend.
///
/// Called twice at startup, once per collection (source and product), with
/// disjoint prefixes.
pub async fn build_blob_store(
    config: &Config,
    prefix: &str,
) -> StorageResult<Arc<dyn BlobStore>> {
    match config.storage_backend() {
        StorageBackend::S3 => {
            #[cfg(feature = "storage-s3")]
            {
                let bucket = config
                    .s3_bucket()
                    .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not set".to_string()))?
                    .to_string();
                let region = config
                    .s3_region()
                    .unwrap_or("us-east-1")
                    .to_string();
                let store = crate::s3::S3BlobStore::new(
                    bucket,
                    region,
                    config.s3_endpoint().map(String::from),
                    prefix.to_string(),
                )?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "storage-s3"))]
            {
                Err(StorageError::ConfigError(
                    "S3 backend requested but the storage-s3 feature is disabled".to_string(),
                ))
            }
        }
        StorageBackend::Local => {
            #[cfg(feature = "storage-local")]
            {
                let base_path = config.local_storage_path().ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not set".to_string())
                })?;
                let store = crate::local::LocalBlobStore::new(base_path, prefix.to_string()).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "storage-local"))]
            {
                Err(StorageError::ConfigError(
                    "Local backend requested but the storage-local feature is disabled".to_string(),
                ))
            }
        }
    }
}
