//! In-memory blob store for tests.

use crate::traits::{BlobStore, StorageError, StorageResult};
use async_trait::async_trait;
use audiomill_core::BlobId;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory blob collection. Not durable; intended for tests and local
/// development where neither S3 nor the filesystem backend is wanted.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<BlobId, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.lock().expect("blob map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes) -> StorageResult<BlobId> {
        let id = BlobId::generate();
        self.blobs
            .lock()
            .expect("blob map lock poisoned")
            .insert(id, data);
        Ok(id)
    }

    async fn get(&self, id: BlobId) -> StorageResult<Bytes> {
        self.blobs
            .lock()
            .expect("blob map lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound(id))
    }

    async fn delete(&self, id: BlobId) -> StorageResult<()> {
        self.blobs
            .lock()
            .expect("blob map lock poisoned")
            .remove(&id);
        Ok(())
    }

    async fn exists(&self, id: BlobId) -> StorageResult<bool> {
        Ok(self
            .blobs
            .lock()
            .expect("blob map lock poisoned")
            .contains_key(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let store = MemoryBlobStore::new();
        let id = store.put(Bytes::from_static(b"bytes")).await.unwrap();

        assert_eq!(store.get(id).await.unwrap(), Bytes::from_static(b"bytes"));
        assert_eq!(store.len(), 1);

        store.delete(id).await.unwrap();
        assert!(store.get(id).await.unwrap_err().is_not_found());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn every_put_gets_a_fresh_id() {
        let store = MemoryBlobStore::new();
        let a = store.put(Bytes::from_static(b"a")).await.unwrap();
        let b = store.put(Bytes::from_static(b"a")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
