//! Token issuance and verification
//!
//! Gates ingress and egress with signed, time-bounded authorization claims.
//! Credentials are looked up through the [`CredentialStore`] collaborator;
//! tokens are self-contained HS256 JWTs verifiable with a single process-wide
//! secret. No state is retained between calls and there is no revocation:
//! a claim dies at its expiry.

mod claims;
mod credentials;
mod postgres;
mod token;

pub use claims::Claim;
pub use credentials::{Credential, CredentialStore, MemoryCredentialStore};
pub use postgres::PgCredentialStore;
pub use token::{AuthError, TokenService};
