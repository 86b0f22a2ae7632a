//! SMTP delivery.
//!
//! The [`Mailer`] trait is the seam between the batch processor and the relay.
//! [`SmtpMailer`] opens a fresh STARTTLS session for every message: connect,
//! upgrade, authenticate, send, quit. Nothing is pooled across records, and the
//! session is dropped on every path, failed sends included. Messages go out
//! with their own envelope, so the sender never has to be a valid mailbox.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use thiserror::Error;
use tracing::debug;

use crate::config::SmtpConfig;
use crate::process::OutgoingMail;

/// Failures while preparing or delivering a message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("SMTP host is not configured")]
    MissingHost,

    #[error("invalid {field} address '{value}': {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Capability to hand a message to a relay.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message in its own session.
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError>;
}

/// Authenticated STARTTLS relay client.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Build a single-use transport for one session.
    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let host = self.config.host.trim();
        if host.is_empty() {
            return Err(DeliveryError::MissingHost);
        }

        let tls = TlsParameters::new(host.to_string())?;

        Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(self.config.port)
            .tls(Tls::Required(tls))
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        let transport = self.build_transport()?;

        debug!(
            host = %self.config.host,
            port = self.config.port,
            "smtp_session_opening"
        );

        let response = transport
            .send_raw(mail.envelope(), &mail.formatted())
            .await?;

        debug!(
            code = %response.code(),
            "smtp_session_closed"
        );

        Ok(())
    }
}
