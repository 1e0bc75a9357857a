use crate::token::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A principal's stored credential material.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Opaque secret, compared exactly (constant-time) against the supplied
    /// value at issuance.
    pub secret: String,
    pub privileged: bool,
}

/// Keyed lookup of a principal's stored secret. Principals are provisioned
/// out-of-band; this interface is read-only.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn lookup(&self, principal_id: &str) -> Result<Option<Credential>, AuthError>;
}

/// In-memory credential store for tests.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    principals: Arc<Mutex<HashMap<String, Credential>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, principal_id: impl Into<String>, secret: impl Into<String>, privileged: bool) {
        self.principals
            .lock()
            .expect("credential map lock poisoned")
            .insert(
                principal_id.into(),
                Credential {
                    secret: secret.into(),
                    privileged,
                },
            );
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup(&self, principal_id: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self
            .principals
            .lock()
            .expect("credential map lock poisoned")
            .get(principal_id)
            .cloned())
    }
}
