//! Notification transport.

use async_trait::async_trait;
use audiomill_core::Config;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Delivers a message to a principal via an external channel. Retrying a
/// delivery is safe: duplicates are acceptable, lost notifications are not.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;
}

/// SMTP transport. Principal identifiers are email addresses, so the
/// recipient is used as-is.
#[derive(Clone)]
pub struct EmailTransport {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl EmailTransport {
    /// Build from config. Returns `None` when SMTP is not configured, in
    /// which case the dispatcher should not be started.
    pub fn from_config(config: &Config) -> Option<Self> {
        let host = config.smtp_host()?;
        let from = config.smtp_from()?.to_string();
        let port = config.smtp_port();

        let mailer = if config.smtp_tls() {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).ok()?;
            let b = b.port(port);
            let b = if let (Some(u), Some(p)) = (config.smtp_user(), config.smtp_password()) {
                b.credentials(Credentials::new(u.to_string(), p.to_string()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "Email transport initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = if let (Some(u), Some(p)) = (config.smtp_user(), config.smtp_password()) {
                b.credentials(Credentials::new(u.to_string(), p.to_string()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "Email transport initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }
}

#[async_trait]
impl Transport for EmailTransport {
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| TransportError::Failed(format!("Invalid recipient address: {}", e)))?;
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| TransportError::Failed(format!("Invalid SMTP_FROM: {}", e)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        tracing::info!(recipient = %recipient, "Notification email sent");
        Ok(())
    }
}
