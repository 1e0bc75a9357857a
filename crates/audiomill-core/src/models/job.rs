use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::BlobId;

/// Unit of work tracked through the conversion pipeline.
///
/// A job travels between stages as an immutable message snapshot: the ingress
/// gateway emits it with `product_blob_id` unset, the conversion worker emits
/// a new snapshot with the product filled in, and the notification dispatcher
/// consumes it terminally. Field names follow the queue wire contract
/// (`sourceBlobId` / `productBlobId` / `ownerPrincipal`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub source_blob_id: BlobId,
    pub product_blob_id: Option<BlobId>,
    pub owner_principal: String,
}

impl Job {
    /// New job for a freshly uploaded source blob. The product id stays unset
    /// until the conversion worker produces it.
    pub fn new(source_blob_id: BlobId, owner_principal: impl Into<String>) -> Self {
        Self {
            source_blob_id,
            product_blob_id: None,
            owner_principal: owner_principal.into(),
        }
    }

    /// Next-stage snapshot with the product blob id set.
    pub fn with_product(&self, product_blob_id: BlobId) -> Self {
        Self {
            source_blob_id: self.source_blob_id,
            product_blob_id: Some(product_blob_id),
            owner_principal: self.owner_principal.clone(),
        }
    }

    /// Serialize for publishing as a queue message body.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("job serialization is infallible")
    }

    /// Parse a queue message body. A failure here means the message is
    /// structurally invalid and can never succeed.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload.clone())
    }
}

/// Position of a job in its pipeline lifecycle. Used for log context; the
/// queue topics, not this enum, are the source of truth for where a message
/// actually sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Submitted,
    Converting,
    Converted,
    Notified,
}

impl Display for JobStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStage::Submitted => write!(f, "submitted"),
            JobStage::Converting => write!(f, "converting"),
            JobStage::Converted => write!(f, "converted"),
            JobStage::Notified => write!(f, "notified"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_wire_format_uses_camel_case_keys() {
        let job = Job::new(BlobId::generate(), "alice@example.com");
        let payload = job.to_payload();

        assert!(payload.get("sourceBlobId").is_some());
        assert!(payload.get("ownerPrincipal").is_some());
        // Unset product id is carried as an explicit null, not omitted.
        assert_eq!(
            payload.get("productBlobId"),
            Some(&serde_json::Value::Null)
        );
    }

    #[test]
    fn job_payload_roundtrip() {
        let job = Job::new(BlobId::generate(), "alice@example.com")
            .with_product(BlobId::generate());
        let parsed = Job::from_payload(&job.to_payload()).unwrap();
        assert_eq!(job, parsed);
    }

    #[test]
    fn with_product_preserves_source_and_owner() {
        let job = Job::new(BlobId::generate(), "bob@example.com");
        let product = BlobId::generate();
        let updated = job.with_product(product);

        assert_eq!(updated.source_blob_id, job.source_blob_id);
        assert_eq!(updated.owner_principal, job.owner_principal);
        assert_eq!(updated.product_blob_id, Some(product));
        // Original snapshot is untouched.
        assert_eq!(job.product_blob_id, None);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let payload = serde_json::json!({ "sourceBlobId": "not-a-uuid" });
        assert!(Job::from_payload(&payload).is_err());
    }
}
