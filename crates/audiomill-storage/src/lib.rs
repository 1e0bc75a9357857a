//! Blob storage backends
//!
//! A blob store holds one collection of immutable, opaquely-addressed binary
//! objects; the identifier is assigned at write time and never reused. The
//! pipeline runs two disjoint collections (uploaded source media and converted
//! audio products), each behind its own [`BlobStore`] handle.

pub mod factory;
pub mod memory;
mod traits;

#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;

pub use factory::build_blob_store;
pub use memory::MemoryBlobStore;
pub use traits::{BlobStore, StorageError, StorageResult};

#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
