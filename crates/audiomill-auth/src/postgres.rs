use crate::credentials::{Credential, CredentialStore};
use crate::token::AuthError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

#[derive(Debug, sqlx::FromRow)]
struct PrincipalRow {
    secret: String,
    privileged: bool,
}

/// Credential store backed by the `principals` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[tracing::instrument(skip(self))]
    async fn lookup(&self, principal_id: &str) -> Result<Option<Credential>, AuthError> {
        let row: Option<PrincipalRow> = sqlx::query_as::<Postgres, PrincipalRow>(
            r#"
            SELECT secret, privileged
            FROM principals
            WHERE identifier = $1
            "#,
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Credential lookup failed");
            AuthError::Store(e.to_string())
        })?;

        Ok(row.map(|r| Credential {
            secret: r.secret,
            privileged: r.privileged,
        }))
    }
}
