use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier for a stored blob, assigned by the blob store at write
/// time. Source and product blobs use disjoint identifier spaces; a `BlobId`
/// is only meaningful together with the store it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(Uuid);

impl BlobId {
    /// Mint a fresh identifier. Called by blob store backends on write.
    pub fn generate() -> Self {
        BlobId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for BlobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.0.fmt(f)
    }
}

impl From<Uuid> for BlobId {
    fn from(id: Uuid) -> Self {
        BlobId(id)
    }
}

impl FromStr for BlobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(BlobId)
    }
}
