//! Token service: issue and verify signed, time-bounded claims.

use crate::claims::Claim;
use crate::credentials::CredentialStore;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Authentication and token verification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Principal absent, or supplied secret does not match the stored one.
    /// Deliberately indistinguishable to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token could not be parsed or split into its segments.
    #[error("malformed token")]
    MalformedToken,

    /// Token parsed and verified, but its validity window has passed.
    #[error("token expired")]
    ExpiredToken,

    /// Any other cryptographic or structural failure.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Credential store was unreachable; not an authentication verdict.
    #[error("credential store error: {0}")]
    Store(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Issues and verifies HS256 claims against a process-wide signing secret.
///
/// Stateless between calls; the secret is loaded once at startup and never
/// rotated at runtime.
pub struct TokenService {
    credentials: Arc<dyn CredentialStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
}

impl TokenService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        signing_secret: &str,
        validity_hours: i64,
    ) -> Self {
        Self {
            credentials,
            encoding_key: EncodingKey::from_secret(signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validity: Duration::hours(validity_hours),
        }
    }

    /// Check the supplied credentials against the store and return a signed
    /// token on success.
    #[tracing::instrument(skip(self, secret))]
    pub async fn issue(&self, principal_id: &str, secret: &str) -> Result<String, AuthError> {
        let credential = self
            .credentials
            .lookup(principal_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !secure_compare(secret, &credential.secret) {
            tracing::debug!(principal = %principal_id, "Secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let claim = Claim {
            sub: principal_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            privileged: credential.privileged,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claim, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))?;

        tracing::info!(principal = %principal_id, privileged = claim.privileged, "Token issued");
        Ok(token)
    }

    /// Verify a bearer token and return the decoded claim.
    pub fn verify(&self, token: &str) -> Result<Claim, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<Claim>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken => AuthError::MalformedToken,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidSignature,
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;

    fn service_with(validity_hours: i64) -> (TokenService, MemoryCredentialStore) {
        let store = MemoryCredentialStore::new();
        store.insert("alice@example.com", "wordpass", true);
        store.insert("bob@example.com", "hunter2", false);
        let service = TokenService::new(
            Arc::new(store.clone()),
            "test-signing-secret-of-sufficient-length",
            validity_hours,
        );
        (service, store)
    }

    #[tokio::test]
    async fn issue_then_verify_preserves_subject_and_privilege() {
        let (service, _) = service_with(24);

        let token = service.issue("alice@example.com", "wordpass").await.unwrap();
        let claim = service.verify(&token).unwrap();

        assert_eq!(claim.sub, "alice@example.com");
        assert!(claim.privileged);
        assert!(claim.exp > claim.iat);

        let token = service.issue("bob@example.com", "hunter2").await.unwrap();
        let claim = service.verify(&token).unwrap();
        assert!(!claim.privileged);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_credentials() {
        let (service, _) = service_with(24);
        assert_eq!(
            service.issue("alice@example.com", "wordpas").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            service.issue("alice@example.com", "wordpasS").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn unknown_principal_is_invalid_credentials() {
        let (service, _) = service_with(24);
        assert_eq!(
            service.issue("mallory@example.com", "anything").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn expired_token_fails_even_with_valid_signature() {
        let (service, _) = service_with(-1);
        let token = service.issue("alice@example.com", "wordpass").await.unwrap();
        assert_eq!(service.verify(&token).unwrap_err(), AuthError::ExpiredToken);
    }

    #[tokio::test]
    async fn tampered_signature_segment_is_invalid_signature() {
        let (service, _) = service_with(24);
        let token = service.issue("alice@example.com", "wordpass").await.unwrap();

        // Flip the last character of the signature segment to a different
        // base64url character.
        let last = token.chars().last().unwrap();
        let replacement = if last == 'A' { 'B' } else { 'A' };
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(replacement);

        assert_eq!(
            service.verify(&tampered).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[tokio::test]
    async fn token_signed_with_different_secret_is_rejected() {
        let (service, store) = service_with(24);
        let other = TokenService::new(
            Arc::new(store),
            "a-completely-different-signing-secret!!",
            24,
        );
        let token = other.issue("alice@example.com", "wordpass").await.unwrap();
        assert_eq!(
            service.verify(&token).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn empty_token_is_malformed() {
        let store = MemoryCredentialStore::new();
        let service = TokenService::new(
            Arc::new(store),
            "test-signing-secret-of-sufficient-length",
            24,
        );
        assert_eq!(service.verify("").unwrap_err(), AuthError::MalformedToken);
        assert_eq!(
            service.verify("not-a-jwt").unwrap_err(),
            AuthError::MalformedToken
        );
    }

    #[test]
    fn secure_compare_requires_exact_match() {
        assert!(secure_compare("secret", "secret"));
        assert!(!secure_compare("secret", "secreT"));
        assert!(!secure_compare("secret", "secret2"));
        assert!(!secure_compare("", "secret"));
    }
}
