use serde::{Deserialize, Serialize};

/// Decoded, verified contents of an authorization token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claim {
    /// Principal identifier the token was issued to.
    pub sub: String,
    /// Issued-at timestamp (unix seconds).
    pub iat: i64,
    /// Expiry timestamp (unix seconds).
    pub exp: i64,
    /// Authorization level. Privileged principals may fetch any stored
    /// artifact; there is no per-owner ACL.
    pub privileged: bool,
}
